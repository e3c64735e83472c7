//! Print a single page

use anyhow::Result;

use crate::JsonPages;

/// Print a page's content, or one of its keys, as pretty JSON
pub fn run(app: &JsonPages, path: &str, key: Option<&str>) -> Result<()> {
    println!("{}", render(app, path, key)?);
    Ok(())
}

/// Pretty JSON for a page's content, or for the value under `key`
pub fn render(app: &JsonPages, path: &str, key: Option<&str>) -> Result<String> {
    let page = app.store.get(path)?;
    let json = match key {
        Some(key) => serde_json::to_string_pretty(page.get(key)?)?,
        None => serde_json::to_string_pretty(page.content()?)?,
    };
    Ok(json)
}
