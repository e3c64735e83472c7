//! Page model

use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

/// Errors raised while reading structured data out of a page
#[derive(Error, Debug, Clone)]
pub enum PageError {
    #[error("Page `{path}` is not valid JSON")]
    Parse {
        path: String,
        #[source]
        source: Arc<serde_json::Error>,
    },

    #[error("Page `{path}` must hold a JSON object at the top level, found {found}")]
    Malformed { path: String, found: &'static str },

    #[error("Page `{path}` has no key `{key}`")]
    KeyNotFound { path: String, key: String },
}

/// One loaded content file.
///
/// `path` and `raw` never change after construction. The parsed mapping is
/// produced on the first call to [`Page::content`] and kept for the life of
/// the page; a changed file yields a new `Page` rather than mutating this one.
pub struct Page {
    /// Logical path the page was requested under, as in `store.get(path)`
    path: String,

    /// Decoded file text at load time
    raw: String,

    /// Outcome of the one parse, failures included
    parsed: OnceLock<Result<Map<String, Value>, PageError>>,

    #[cfg(test)]
    parses: AtomicUsize,
}

impl Page {
    /// Create a page from its logical path and decoded file text
    pub fn new(path: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            raw: raw.into(),
            parsed: OnceLock::new(),
            #[cfg(test)]
            parses: AtomicUsize::new(0),
        }
    }

    /// Logical path this page was loaded for
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Verbatim file text
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The page's top-level mapping, parsed on first access.
    ///
    /// Empty or falsy documents (`""`, `null`, `false`, `0`, `[]`, `{}`) give
    /// an empty mapping. Any other non-object document is
    /// [`PageError::Malformed`]. The raw text is parsed at most once per
    /// page, even when several threads ask at the same time; a failure is
    /// kept and returned again on later calls.
    pub fn content(&self) -> Result<&Map<String, Value>, PageError> {
        self.parsed
            .get_or_init(|| self.parse())
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Shortcut for `content()?[key]` that reports a missing key instead of
    /// falling back to a default
    pub fn get(&self, key: &str) -> Result<&Value, PageError> {
        self.content()?
            .get(key)
            .ok_or_else(|| PageError::KeyNotFound {
                path: self.path.clone(),
                key: key.to_string(),
            })
    }

    /// Whether the parse has already happened, successfully or not
    pub fn is_parsed(&self) -> bool {
        self.parsed.get().is_some()
    }

    fn parse(&self) -> Result<Map<String, Value>, PageError> {
        #[cfg(test)]
        self.parses.fetch_add(1, Ordering::SeqCst);

        if self.raw.trim().is_empty() {
            return Ok(Map::new());
        }

        let value: Value = serde_json::from_str(&self.raw).map_err(|source| PageError::Parse {
            path: self.path.clone(),
            source: Arc::new(source),
        })?;

        match value {
            Value::Object(map) => Ok(map),
            other if is_falsy(&other) => Ok(Map::new()),
            other => Err(PageError::Malformed {
                path: self.path.clone(),
                found: kind_name(&other),
            }),
        }
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Page {:?}>", self.path)
    }
}

/// Values a JSON document may hold at the top level and still count as empty
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Barrier;
    use std::thread;

    impl Page {
        fn parse_count(&self) -> usize {
            self.parses.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_content_parses_object() {
        let page = Page::new("about", r#"{"title": "Hello", "tags": ["a", "b"]}"#);
        let content = page.content().unwrap();
        assert_eq!(content["title"], json!("Hello"));
        assert_eq!(content["tags"], json!(["a", "b"]));
    }

    #[test]
    fn test_content_keeps_file_order() {
        let page = Page::new("order", r#"{"zeta": 1, "alpha": 2, "mid": 3}"#);
        let keys: Vec<_> = page.content().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_content_is_memoized() {
        let page = Page::new("about", r#"{"title": "Hello"}"#);
        assert!(!page.is_parsed());

        let first = page.content().unwrap() as *const _;
        assert!(page.is_parsed());
        let second = page.content().unwrap() as *const _;
        assert_eq!(first, second);
        assert_eq!(page.parse_count(), 1);
    }

    #[test]
    fn test_empty_documents_normalize_to_empty_map() {
        for raw in ["", "   \n", "null", "false", "0", "0.0", "\"\"", "[]", "{}"] {
            let page = Page::new("empty", raw);
            assert!(page.content().unwrap().is_empty(), "raw: {:?}", raw);
        }
    }

    #[test]
    fn test_non_object_is_malformed() {
        for (raw, found) in [
            ("[1, 2, 3]", "an array"),
            ("42", "a number"),
            ("true", "a boolean"),
            ("\"text\"", "a string"),
        ] {
            let page = Page::new("bad", raw);
            match page.content() {
                Err(PageError::Malformed { path, found: kind }) => {
                    assert_eq!(path, "bad");
                    assert_eq!(kind, found);
                }
                other => panic!("expected malformed for {:?}, got {:?}", raw, other),
            }
            // The failure is kept, not recomputed
            assert!(page.is_parsed());
            assert!(page.content().is_err());
            assert_eq!(page.parse_count(), 1);
        }
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let page = Page::new("broken", "{\"title\": ");
        let err = page.content().unwrap_err();
        assert!(matches!(err, PageError::Parse { .. }));
        assert!(err.to_string().contains("broken"));

        assert!(matches!(page.get("title"), Err(PageError::Parse { .. })));
        assert_eq!(page.parse_count(), 1);
    }

    #[test]
    fn test_get_key() {
        let page = Page::new("hello", r#"{"title": "Hello"}"#);
        assert_eq!(page.get("title").unwrap(), &json!("Hello"));

        match page.get("missing") {
            Err(PageError::KeyNotFound { path, key }) => {
                assert_eq!(path, "hello");
                assert_eq!(key, "missing");
            }
            other => panic!("expected missing key, got {:?}", other),
        }
    }

    #[test]
    fn test_get_key_on_empty_page() {
        let page = Page::new("blank", "");
        assert!(matches!(
            page.get("title"),
            Err(PageError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn test_debug_shows_path() {
        let page = Page::new("docs/intro", "{}");
        assert_eq!(format!("{:?}", page), "<Page \"docs/intro\">");
    }

    #[test]
    fn test_shared_page_parses_once_across_threads() {
        let raw = format!(
            "{{{}}}",
            (0..20_000)
                .map(|i| format!("\"k{}\": {}", i, i))
                .collect::<Vec<_>>()
                .join(",")
        );
        let page = Arc::new(Page::new("shared", raw));
        let start = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let page = Arc::clone(&page);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    page.content().unwrap().len()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 20_000);
        }
        assert_eq!(page.parse_count(), 1);
    }

    #[test]
    fn test_shared_malformed_page_parses_once_across_threads() {
        let page = Arc::new(Page::new("list", "[1, 2, 3]"));
        let start = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let page = Arc::clone(&page);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    matches!(page.content(), Err(PageError::Malformed { .. }))
                })
            })
            .collect();

        assert!(handles.into_iter().all(|h| h.join().unwrap()));
        assert_eq!(page.parse_count(), 1);
    }
}
