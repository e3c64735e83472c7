//! Page store configuration (pages.yml)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error in `{0}`")]
    Yaml(PathBuf, #[source] serde_yaml::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Where pages live and how their files are named and decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagesConfig {
    /// Content root, relative to the site directory unless absolute
    pub root: PathBuf,
    /// Suffix appended to a logical path to find its file
    pub extension: String,
    /// Text encoding of page files
    pub encoding: Encoding,
    /// Base name of the file served for a directory
    pub index_name: String,
    /// Upper bound on cached pages; least recently used pages are evicted
    pub max_entries: Option<usize>,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("pages"),
            extension: ".json".to_string(),
            encoding: Encoding::Utf8,
            index_name: "index".to_string(),
            max_entries: None,
        }
    }
}

impl PagesConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: PagesConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Yaml(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index_name.is_empty() {
            return Err(ConfigError::Validation(
                "index_name must not be empty".to_string(),
            ));
        }
        if self.index_name.contains('/') {
            return Err(ConfigError::Validation(format!(
                "index_name `{}` must be a bare file name",
                self.index_name
            )));
        }
        if self.max_entries == Some(0) {
            return Err(ConfigError::Validation(
                "max_entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Content root resolved against `base_dir`
    pub fn root_in(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.root)
    }

    /// File name used for directory paths, e.g. `index.json`
    pub fn index_file_name(&self) -> String {
        format!("{}{}", self.index_name, self.extension)
    }
}

/// Supported text encodings for page files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Encoding {
    Utf8,
    Ascii,
    Latin1,
}

/// File bytes that do not form text in the configured encoding
#[derive(Debug, Error)]
#[error("invalid {encoding} byte 0x{byte:02x} at offset {offset}")]
pub struct DecodeError {
    pub encoding: Encoding,
    pub offset: usize,
    pub byte: u8,
}

impl Encoding {
    /// Canonical label, as written in configuration
    pub fn label(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf8",
            Encoding::Ascii => "ascii",
            Encoding::Latin1 => "latin1",
        }
    }

    /// Decode file bytes into text
    pub fn decode(self, bytes: Vec<u8>) -> Result<String, DecodeError> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes).map_err(|e| {
                let offset = e.utf8_error().valid_up_to();
                DecodeError {
                    encoding: self,
                    offset,
                    byte: e.as_bytes()[offset],
                }
            }),
            Encoding::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(offset) => Err(DecodeError {
                    encoding: self,
                    offset,
                    byte: bytes[offset],
                }),
                None => Ok(bytes.into_iter().map(char::from).collect()),
            },
            // Every Latin-1 byte maps to the code point of the same value
            Encoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
        }
    }
}

impl TryFrom<String> for Encoding {
    type Error = String;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        label.parse()
    }
}

impl std::str::FromStr for Encoding {
    type Err = String;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "ascii" | "us-ascii" => Ok(Encoding::Ascii),
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" => Ok(Encoding::Latin1),
            other => Err(format!("unsupported encoding `{}`", other)),
        }
    }
}

impl From<Encoding> for String {
    fn from(encoding: Encoding) -> Self {
        encoding.label().to_string()
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = PagesConfig::default();
        assert_eq!(config.root, PathBuf::from("pages"));
        assert_eq!(config.extension, ".json");
        assert_eq!(config.encoding, Encoding::Utf8);
        assert_eq!(config.index_name, "index");
        assert_eq!(config.max_entries, None);
        assert_eq!(config.index_file_name(), "index.json");
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
root: content
extension: .page
encoding: ISO-8859-1
max_entries: 128
"#;
        let config: PagesConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.root, PathBuf::from("content"));
        assert_eq!(config.extension, ".page");
        assert_eq!(config.encoding, Encoding::Latin1);
        assert_eq!(config.index_name, "index");
        assert_eq!(config.max_entries, Some(128));
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let err = serde_yaml::from_str::<PagesConfig>("encoding: ebcdic").unwrap_err();
        assert!(err.to_string().contains("unsupported encoding"));
    }

    #[test]
    fn test_load_validates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pages.yml");

        fs::write(&path, "max_entries: 0\n").unwrap();
        assert!(matches!(
            PagesConfig::load(&path),
            Err(ConfigError::Validation(_))
        ));

        fs::write(&path, "index_name: ''\n").unwrap();
        assert!(matches!(
            PagesConfig::load(&path),
            Err(ConfigError::Validation(_))
        ));

        fs::write(&path, "index_name: home\n").unwrap();
        assert_eq!(PagesConfig::load(&path).unwrap().index_name, "home");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = PagesConfig::load(&dir.path().join("pages.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
        assert!(err.to_string().contains("pages.yml"));
    }

    #[test]
    fn test_decode_utf8() {
        let text = Encoding::Utf8.decode("{\"t\": \"é\"}".into()).unwrap();
        assert_eq!(text, "{\"t\": \"é\"}");

        let err = Encoding::Utf8.decode(vec![b'{', 0xff, b'}']).unwrap_err();
        assert_eq!(err.offset, 1);
        assert_eq!(err.byte, 0xff);
    }

    #[test]
    fn test_decode_ascii() {
        assert_eq!(Encoding::Ascii.decode(b"{}".to_vec()).unwrap(), "{}");
        let err = Encoding::Ascii.decode("é".into()).unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(err.byte, 0xc3);
    }

    #[test]
    fn test_decode_latin1() {
        assert_eq!(Encoding::Latin1.decode(vec![0x63, 0x61, 0x66, 0xe9]).unwrap(), "café");
    }
}
