//! The `Data` node that flows through the extraction pipeline.
//!
//! Every input, intermediate container, and plain-text leaf is a [`Data`]:
//! body content, an identifying URI, a MIME type (explicit or guessed),
//! metadata attributes, resource bounds propagated from the parent, and a
//! lineage chain back to the root input.

use std::borrow::Cow;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::attributes::Attributes;
use crate::content::{Content, DEFAULT_SPILL_THRESHOLD};
use crate::limits::TimeValue;
use crate::mime::MimeRegistry;
use crate::uri;

/// A snapshot of an ancestor node. Lineage forms a strict tree rooted at the
/// original input: each node points at most at one parent and the chain is
/// finite by construction.
#[derive(Debug, Clone)]
pub struct Lineage {
    pub uri: Option<String>,
    pub mime_type: Option<String>,
    pub parent: Option<Arc<Lineage>>,
}

impl Lineage {
    /// Length of the chain up to and including the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.parent.as_deref();
        while let Some(node) = current {
            depth += 1;
            current = node.parent.as_deref();
        }
        depth
    }

    /// The root ancestor of this chain.
    #[must_use]
    pub fn root(&self) -> &Lineage {
        let mut current = self;
        while let Some(parent) = current.parent.as_deref() {
            current = parent;
        }
        current
    }
}

/// A rendered preview of a node, produced by an external renderer.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// One node in the decomposition tree.
#[derive(Debug)]
pub struct Data {
    uri: Option<String>,
    path: Option<PathBuf>,
    mime_type: Option<String>,
    pub attributes: Attributes,
    source: Option<Arc<Lineage>>,
    content: Content,
    /// Time budget for decomposing this node
    pub timeout: TimeValue,
    /// Truncation bound for the normalized leaf body
    pub max_body_size: Option<u64>,
    pub need_screenshot: bool,
    pub expected_screenshot_size: Option<(u32, u32)>,
    pub screenshot: Option<Screenshot>,
}

impl Data {
    fn empty() -> Self {
        Self {
            uri: None,
            path: None,
            mime_type: None,
            attributes: Attributes::new(),
            source: None,
            content: Content::Empty,
            timeout: TimeValue::UNBOUNDED,
            max_body_size: None,
            need_screenshot: false,
            expected_screenshot_size: None,
            screenshot: None,
        }
    }

    /// Wrap a caller-owned file as a root input. The file is referenced, not
    /// copied, and never deleted by the pipeline.
    pub fn from_path(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let mut data = Self::empty();
        data.uri = Some(path.to_string_lossy().into_owned());
        data.content = Content::from_path(&path)?;
        data.path = Some(path);
        Ok(data)
    }

    /// Wrap an in-memory byte buffer.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let mut data = Self::empty();
        data.content = Content::from_bytes(bytes);
        data
    }

    /// Capture a stream, spilling to a temp file above the default threshold.
    pub fn from_reader<R: Read>(reader: R) -> io::Result<Self> {
        let mut data = Self::empty();
        data.content = Content::from_reader(reader, DEFAULT_SPILL_THRESHOLD)?;
        Ok(data)
    }

    /// A derived plain-text node.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        let mut data = Self::empty();
        data.mime_type = Some("text/plain".to_string());
        data.content = Content::from_bytes(body.into().into_bytes());
        data
    }

    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// The URI, or `""` for anonymous in-memory nodes. For error reporting.
    #[must_use]
    pub fn uri_or_empty(&self) -> &str {
        self.uri.as_deref().unwrap_or("")
    }

    pub fn set_uri(&mut self, uri: impl Into<String>) {
        self.uri = Some(uri.into());
    }

    /// Derive this node's URI from a parent URI by replacing the extension
    /// with `.txt` (derived-text convention).
    pub fn set_text_uri_from(&mut self, parent_uri: &str) {
        self.uri = Some(uri::text_uri(parent_uri));
    }

    /// Local filesystem path for external-tool interop: the explicit path if
    /// set, otherwise the spill file backing the content.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().or_else(|| self.content.path())
    }

    /// The explicitly assigned MIME type. Guessing never overwrites this.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn set_mime_type(&mut self, mime_type: impl Into<String>) {
        self.mime_type = Some(mime_type.into());
    }

    /// Guess a MIME type from the extension registry, then magic bytes.
    #[must_use]
    pub fn guess_mime_type(&self, registry: &MimeRegistry) -> Option<String> {
        if let Some(found) = self.extension().and_then(|ext| registry.find(&ext)) {
            return Some(found.to_string());
        }
        let head = self.peek(512).ok()?;
        registry.sniff(&head)
    }

    /// Fill in a guessed MIME type when none was explicitly set.
    pub fn ensure_mime_type(&mut self, registry: &MimeRegistry) {
        if self.mime_type.is_none() {
            self.mime_type = self.guess_mime_type(registry);
        }
    }

    /// Normalized (lowercased, no dot) extension of the URI or path.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let name = match (&self.uri, &self.path) {
            (Some(uri), _) => uri.rsplit('/').next()?.to_string(),
            (None, Some(path)) => path.file_name()?.to_string_lossy().into_owned(),
            (None, None) => return None,
        };
        let dot = name.rfind('.')?;
        if dot == 0 || dot + 1 == name.len() {
            return None;
        }
        Some(name[dot + 1..].to_ascii_lowercase())
    }

    /// `true` for exactly `text/plain`.
    #[must_use]
    pub fn is_text_plain(&self) -> bool {
        self.mime_type() == Some("text/plain")
    }

    /// `true` for any `text/*` type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.mime_type().is_some_and(|m| m.starts_with("text/"))
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.content.size()
    }

    pub fn body(&self) -> io::Result<Cow<'_, [u8]>> {
        self.content.body()
    }

    pub fn peek(&self, n: usize) -> io::Result<Vec<u8>> {
        self.content.peek(n)
    }

    pub fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        self.content.open()
    }

    /// Replace the body content in place (leaf normalization).
    pub fn set_body_bytes(&mut self, bytes: Vec<u8>) {
        self.content = Content::from_bytes(bytes);
    }

    #[must_use]
    pub fn source(&self) -> Option<&Arc<Lineage>> {
        self.source.as_ref()
    }

    pub(crate) fn set_source_lineage(&mut self, lineage: Arc<Lineage>) {
        self.source = Some(lineage);
    }

    /// A lineage snapshot of this node, for attaching to children.
    #[must_use]
    pub fn lineage(&self) -> Arc<Lineage> {
        Arc::new(Lineage {
            uri: self.uri.clone(),
            mime_type: self.mime_type.clone(),
            parent: self.source.clone(),
        })
    }

    /// Drop this node's backing resources. The extractor calls this exactly
    /// once per non-root node after its subtree is fully processed; the root
    /// belongs to the caller.
    pub fn release(&mut self) {
        self.content.release();
        self.screenshot = None;
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.content.is_released()
    }
}

/// Collects the children a decomposer yields, applying the merge contract on
/// every push: resource bounds and screenshot requests are copied forward
/// from the parent and `source` is set to the parent's lineage, so the
/// invariants hold by construction rather than by decomposer discipline.
#[derive(Debug)]
pub struct Children {
    items: Vec<Data>,
    source: Arc<Lineage>,
    timeout: TimeValue,
    max_body_size: Option<u64>,
    need_screenshot: bool,
    expected_screenshot_size: Option<(u32, u32)>,
}

impl Children {
    #[must_use]
    pub fn for_parent(parent: &Data) -> Self {
        Self {
            items: Vec::new(),
            source: parent.lineage(),
            timeout: parent.timeout,
            max_body_size: parent.max_body_size,
            need_screenshot: parent.need_screenshot,
            expected_screenshot_size: parent.expected_screenshot_size,
        }
    }

    pub fn push(&mut self, mut child: Data) {
        child.set_source_lineage(self.source.clone());
        child.timeout = child.timeout.min(self.timeout);
        child.max_body_size = crate::limits::min_size(child.max_body_size, self.max_body_size);
        child.need_screenshot = self.need_screenshot;
        if child.expected_screenshot_size.is_none() {
            child.expected_screenshot_size = self.expected_screenshot_size;
        }
        self.items.push(child);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<Data> {
        self.items
    }
}
