//! The recursive extraction engine.
//!
//! Extraction is a depth-first walk over the decomposition tree. Each node is
//! MIME-typed, then either emitted as a normalized text leaf or handed to the
//! lowest-scoring decomposer that bid on it. Children are processed in the
//! order their decomposer produced them and released as soon as their subtree
//! is done, so peak resource usage tracks tree depth rather than tree size.

use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;
use textpeel_core::encoding::normalize_utf8;
use textpeel_core::{Data, Decomposer, ExtractError, MimeRegistry, Result};
use tracing::{debug, warn};

/// Receives each text leaf as it is produced, in depth-first order.
pub type Sink<'a> = dyn FnMut(&Data) + Send + 'a;

pub struct Extractor {
    decomposers: Vec<Arc<dyn Decomposer>>,
    mime_registry: MimeRegistry,
}

impl Extractor {
    #[must_use]
    pub fn new(decomposers: Vec<Arc<dyn Decomposer>>, mime_registry: MimeRegistry) -> Self {
        Self {
            decomposers,
            mime_registry,
        }
    }

    /// The decomposer handling `data`: lowest score wins, registration order
    /// breaks ties.
    #[must_use]
    pub fn select(&self, data: &Data) -> Option<&Arc<dyn Decomposer>> {
        let mut best: Option<(i32, &Arc<dyn Decomposer>)> = None;
        for decomposer in &self.decomposers {
            if let Some(score) = decomposer.target_score(data) {
                match best {
                    Some((best_score, _)) if best_score <= score => {}
                    _ => best = Some((score, decomposer)),
                }
            }
        }
        best.map(|(_, decomposer)| decomposer)
    }

    /// Walk the decomposition tree rooted at `data`, feeding every text leaf
    /// to `sink`. The root is the caller's and is never released; every
    /// derived node is released once its subtree is done, also on error.
    pub async fn extract(&self, data: &mut Data, sink: &mut Sink<'_>) -> Result<()> {
        self.extract_node(data, sink).await
    }

    /// Convenience wrapper: wrap a file and collect all leaf bodies.
    pub async fn extract_path(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        let path = path.as_ref();
        let mut data = Data::from_path(path).map_err(|source| ExtractError::Input {
            uri: path.to_string_lossy().into_owned(),
            source,
        })?;
        let mut texts = Vec::new();
        let mut sink = |leaf: &Data| {
            if let Ok(body) = leaf.body() {
                texts.push(String::from_utf8_lossy(&body).into_owned());
            }
        };
        self.extract(&mut data, &mut sink).await?;
        Ok(texts)
    }

    fn extract_node<'a>(
        &'a self,
        data: &'a mut Data,
        sink: &'a mut Sink<'_>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            data.ensure_mime_type(&self.mime_registry);
            debug!(
                uri = data.uri_or_empty(),
                mime_type = data.mime_type().unwrap_or("unknown"),
                size = data.size(),
                "extracting"
            );

            if data.is_text_plain() {
                self.emit_leaf(data, sink)?;
                return Ok(());
            }

            let Some(decomposer) = self.select(data) else {
                if data.is_text() {
                    // Unhandled text/* still counts as text.
                    self.emit_leaf(data, sink)?;
                } else {
                    debug!(
                        uri = data.uri_or_empty(),
                        mime_type = data.mime_type().unwrap_or("unknown"),
                        "no decomposer: no text extracted"
                    );
                }
                return Ok(());
            };

            debug!(
                uri = data.uri_or_empty(),
                decomposer = decomposer.name(),
                "decomposing"
            );
            let mut children = textpeel_core::Children::for_parent(data);
            let decomposed = match data.timeout.as_duration() {
                Some(budget) => tokio::time::timeout(budget, decomposer.decompose(data, &mut children))
                    .await
                    .map_err(|_| {
                        warn!(
                            uri = data.uri_or_empty(),
                            decomposer = decomposer.name(),
                            timeout = %data.timeout,
                            "decomposition timed out"
                        );
                        ExtractError::Timeout {
                            uri: data.uri_or_empty().to_string(),
                            timeout: data.timeout,
                        }
                    })?,
                None => decomposer.decompose(data, &mut children).await,
            };
            decomposed?;

            for mut child in children.into_inner() {
                let walked = self.extract_node(&mut child, sink).await;
                child.release();
                walked?;
            }
            Ok(())
        })
    }

    /// Normalize a leaf body to bounded UTF-8 in place and emit it.
    fn emit_leaf(&self, data: &mut Data, sink: &mut Sink<'_>) -> Result<()> {
        let declared = data.attributes.encoding().map(|e| e.name().to_string());
        let max = data.max_body_size.map(|n| n as usize);
        let body = data.body()?;
        let text = normalize_utf8(&body, declared.as_deref(), max);
        drop(body);
        data.set_body_bytes(text.into_bytes());
        data.attributes.set_encoding("UTF-8");
        sink(data);
        Ok(())
    }
}
