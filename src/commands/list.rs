//! List the pages under the content root

use anyhow::Result;
use serde_json::Value;

use crate::JsonPages;

/// List every page path, optionally with the value of one field
pub fn run(app: &JsonPages, field: Option<&str>) -> Result<()> {
    let paths = app.store.paths()?;
    println!("Pages ({}):", paths.len());

    for path in paths {
        match field {
            Some(field) => println!("  {} [{}]", path, describe(app, &path, field)),
            None => println!("  {}", path),
        }
    }

    Ok(())
}

/// Short display of `field` on the page at `path`; load problems are shown
/// inline so one bad file does not hide the rest of the listing
fn describe(app: &JsonPages, path: &str, field: &str) -> String {
    let page = match app.store.get(path) {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Failed to load page {}: {}", path, e);
            return "unreadable".to_string();
        }
    };

    match page.content() {
        Ok(content) => match content.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "-".to_string(),
        },
        Err(e) => {
            tracing::warn!("Failed to parse page {}: {}", path, e);
            "malformed".to_string()
        }
    }
}
