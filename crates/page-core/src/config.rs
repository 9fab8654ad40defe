use serde::{Deserialize, Serialize};

/// Top-level configuration (loaded from page.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub log: LogConfig,
    pub crypto: CryptoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// Encryption parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// log2 of the scrypt work factor used when encrypting to a passphrase (default: 18)
    pub scrypt_work_factor: u8,
    /// Largest log2 scrypt work factor accepted when decrypting (default: 22)
    pub max_scrypt_work_factor: u8,
    /// Emit ASCII-armored output by default
    pub armor: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            scrypt_work_factor: 18,
            max_scrypt_work_factor: 22,
            armor: false,
        }
    }
}

impl PageConfig {
    /// Parse a TOML document, filling unspecified fields with defaults.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Load from `path`, or return defaults if the file does not exist.
    pub fn load(path: &std::path::Path) -> Result<Self, crate::PageError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::PageError::Usage(format!("reading config {}: {e}", path.display())))?;
        Self::from_toml(&content)
            .map_err(|e| crate::PageError::Usage(format!("parsing config {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[log]
level = "debug"
format = "json"

[crypto]
scrypt_work_factor = 15
max_scrypt_work_factor = 20
armor = true
"#;
        let config = PageConfig::from_toml(toml_str).unwrap();

        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
        assert_eq!(config.crypto.scrypt_work_factor, 15);
        assert_eq!(config.crypto.max_scrypt_work_factor, 20);
        assert!(config.crypto.armor);
    }

    #[test]
    fn test_parse_defaults() {
        let config = PageConfig::from_toml("").unwrap();

        assert_eq!(config.log.level, "warn");
        assert_eq!(config.log.format, "text");
        assert_eq!(config.crypto.scrypt_work_factor, 18);
        assert_eq!(config.crypto.max_scrypt_work_factor, 22);
        assert!(!config.crypto.armor);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[crypto]
armor = true
"#;
        let config = PageConfig::from_toml(toml_str).unwrap();

        // Overridden
        assert!(config.crypto.armor);
        // Defaults
        assert_eq!(config.crypto.scrypt_work_factor, 18);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = PageConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = PageConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.log.format, parsed.log.format);
        assert_eq!(
            config.crypto.max_scrypt_work_factor,
            parsed.crypto.max_scrypt_work_factor
        );
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = PageConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.crypto.scrypt_work_factor, 18);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("page.toml");
        std::fs::write(&path, "[log]\nlevel = \"trace\"\n").unwrap();

        let config = PageConfig::load(&path).unwrap();
        assert_eq!(config.log.level, "trace");
    }

    #[test]
    fn test_load_malformed_file_is_usage_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("page.toml");
        std::fs::write(&path, "[crypto\n").unwrap();

        let err = PageConfig::load(&path).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Usage);
    }
}
