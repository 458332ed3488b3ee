//! Named decomposer factories with glob-based activation.
//!
//! Registration order is load order and defines the tie-break order during
//! extraction, so the registry keeps an ordered list rather than a map.
//! `create` turns configured name patterns plus per-decomposer options into
//! live decomposer instances.

use std::collections::HashMap;
use std::sync::Arc;

use textpeel_core::Decomposer;
use thiserror::Error;
use tracing::{debug, warn};

/// Per-decomposer configuration options, as parsed from the config file.
pub type Options = serde_json::Map<String, serde_json::Value>;

/// Builds a decomposer from its options. `Ok(None)` means the decomposer is
/// not usable with the given options and should be skipped.
pub type Factory =
    Box<dyn Fn(&Options) -> Result<Option<Arc<dyn Decomposer>>, RegistryError> + Send + Sync>;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("unknown option <{option}> for decomposer <{decomposer}>")]
    UnknownOption { decomposer: String, option: String },
    #[error("invalid option <{option}> for decomposer <{decomposer}>: {detail}")]
    InvalidOption {
        decomposer: String,
        option: String,
        detail: String,
    },
}

/// An ordered registry of decomposer factories.
pub struct DecomposerRegistry {
    entries: Vec<(String, Factory)>,
}

impl DecomposerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// All built-in decomposers in their canonical order: structural formats
    /// first, the catch-all HTTP delegate last.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("csv", no_options("csv", || Arc::new(crate::csv::Csv::new())));
        registry.register(
            "gzip",
            no_options("gzip", || Arc::new(crate::gzip::Gzip::new())),
        );
        registry.register("tar", no_options("tar", || Arc::new(crate::tar::Tar::new())));
        registry.register("zip", no_options("zip", || Arc::new(crate::zip::Zip::new())));
        registry.register("xml", no_options("xml", || Arc::new(crate::xml::Xml::new())));
        for kind in crate::opendocument::Kind::ALL {
            registry.register(
                kind.decomposer_name(),
                no_options(kind.decomposer_name(), move || {
                    Arc::new(crate::opendocument::OpenDocument::new(kind))
                }),
            );
        }
        for kind in crate::office_open_xml::Kind::ALL {
            registry.register(
                kind.decomposer_name(),
                no_options(kind.decomposer_name(), move || {
                    Arc::new(crate::office_open_xml::OfficeOpenXml::new(kind))
                }),
            );
        }
        registry.register(
            "http-server",
            Box::new(|options| crate::http_server::HttpServer::from_options(options)),
        );
        registry
    }

    /// Register a factory. Re-registering a name replaces the factory in
    /// place, keeping the original position.
    pub fn register(&mut self, name: &str, factory: Factory) {
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| n == name) {
            slot.1 = factory;
        } else {
            self.entries.push((name.to_string(), factory));
        }
    }

    /// Registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Instantiate the decomposers whose names match any of `patterns`
    /// (shell-style globs, `*` and `?`), in registration order.
    pub fn create(
        &self,
        patterns: &[String],
        options: &HashMap<String, Options>,
    ) -> Result<Vec<Arc<dyn Decomposer>>, RegistryError> {
        for pattern in patterns {
            if !self.entries.iter().any(|(name, _)| glob_match(pattern, name)) {
                warn!(pattern, "decomposer pattern matched nothing");
            }
        }

        let empty = Options::new();
        let mut decomposers = Vec::new();
        for (name, factory) in &self.entries {
            if !patterns.iter().any(|pattern| glob_match(pattern, name)) {
                continue;
            }
            let opts = options.get(name).unwrap_or(&empty);
            match factory(opts)? {
                Some(decomposer) => decomposers.push(decomposer),
                None => debug!(name, "decomposer skipped: not configured"),
            }
        }
        Ok(decomposers)
    }
}

impl Default for DecomposerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap a simple constructor into a factory that rejects all options.
fn no_options<F>(name: &'static str, build: F) -> Factory
where
    F: Fn() -> Arc<dyn Decomposer> + Send + Sync + 'static,
{
    Box::new(move |options| {
        if let Some(option) = options.keys().next() {
            return Err(RegistryError::UnknownOption {
                decomposer: name.to_string(),
                option: option.clone(),
            });
        }
        Ok(Some(build()))
    })
}

/// Shell-style glob match over decomposer names.
///
/// Iterative two-pointer matching: each `*` remembers its position and
/// re-consumes one more name character on mismatch, so runtime stays
/// linear in `pattern.len() * name.len()` even for star-heavy patterns.
fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    let (mut p, mut n) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, n));
            p += 1;
        } else if let Some((star_p, star_n)) = star {
            p = star_p + 1;
            n = star_n + 1;
            star = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|ch| *ch == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> Vec<String> {
        vec!["*".to_string()]
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("zip", "zip"));
        assert!(!glob_match("zip", "gzip"));
        assert!(glob_match("*zip", "gzip"));
        assert!(glob_match("opendocument-*", "opendocument-text"));
        assert!(glob_match("?ar", "tar"));
        assert!(!glob_match("?ar", "ar"));
    }

    #[test]
    fn test_glob_match_star_runs_stay_fast() {
        // Star-heavy patterns must not blow up combinatorially.
        let pattern = "*".repeat(40) + "a";
        let name = "b".repeat(200);
        assert!(!glob_match(&pattern, &name));
        let name = "b".repeat(200) + "a";
        assert!(glob_match(&pattern, &name));
        assert!(glob_match("a***", "a"));
    }

    #[test]
    fn test_default_order() {
        let registry = DecomposerRegistry::with_defaults();
        assert_eq!(
            registry.names(),
            vec![
                "csv",
                "gzip",
                "tar",
                "zip",
                "xml",
                "opendocument-text",
                "opendocument-presentation",
                "opendocument-spreadsheet",
                "office-open-xml-document",
                "office-open-xml-presentation",
                "office-open-xml-workbook",
                "http-server",
            ]
        );
    }

    #[test]
    fn test_create_all_skips_unconfigured_delegate() {
        let registry = DecomposerRegistry::with_defaults();
        let decomposers = registry.create(&all(), &HashMap::new()).unwrap();
        // http-server has no URL configured, so it is skipped.
        assert_eq!(decomposers.len(), registry.names().len() - 1);
        assert_eq!(decomposers[0].name(), "csv");
    }

    #[test]
    fn test_create_subset_by_pattern() {
        let registry = DecomposerRegistry::with_defaults();
        let decomposers = registry
            .create(&[String::from("opendocument-*")], &HashMap::new())
            .unwrap();
        let names: Vec<&str> = decomposers.iter().map(|d| d.name()).collect();
        assert_eq!(
            names,
            vec![
                "opendocument-text",
                "opendocument-presentation",
                "opendocument-spreadsheet",
            ]
        );
    }

    #[test]
    fn test_unknown_option_rejected() {
        let registry = DecomposerRegistry::with_defaults();
        let mut options = HashMap::new();
        let mut csv_options = Options::new();
        csv_options.insert("delimiter".to_string(), serde_json::json!(";"));
        options.insert("csv".to_string(), csv_options);

        let err = registry.create(&all(), &options).err().unwrap();
        assert!(matches!(
            err,
            RegistryError::UnknownOption { ref decomposer, ref option }
                if decomposer == "csv" && option == "delimiter"
        ));
    }

    #[test]
    fn test_http_server_configured_by_url() {
        let registry = DecomposerRegistry::with_defaults();
        let mut options = HashMap::new();
        let mut http_options = Options::new();
        http_options.insert(
            "url".to_string(),
            serde_json::json!("http://127.0.0.1:8080/extraction"),
        );
        options.insert("http-server".to_string(), http_options);

        let decomposers = registry
            .create(&[String::from("http-server")], &options)
            .unwrap();
        assert_eq!(decomposers.len(), 1);
        assert_eq!(decomposers[0].name(), "http-server");
    }

    #[test]
    fn test_reregistration_keeps_position() {
        let mut registry = DecomposerRegistry::with_defaults();
        let before = registry
            .names()
            .iter()
            .position(|n| *n == "tar")
            .unwrap();
        registry.register(
            "tar",
            Box::new(|_| Ok(Some(Arc::new(crate::tar::Tar::new()) as Arc<dyn Decomposer>))),
        );
        let after = registry.names().iter().position(|n| *n == "tar").unwrap();
        assert_eq!(before, after);
    }
}
