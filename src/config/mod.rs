//! Configuration module

mod pages;

pub use pages::ConfigError;
pub use pages::DecodeError;
pub use pages::Encoding;
pub use pages::PagesConfig;

/// Config file looked up in the site directory
pub const CONFIG_FILE: &str = "pages.yml";
