//! Bridge configuration and the traits record handed to the engine.
//!
//! The configuration only carries distribution metadata and loader hints.
//! Data directories are not configuration: they are the arguments of
//! `start`.

use std::ffi::{c_int, CString};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::ffi::RimeTraits;
use crate::marshal::host_to_native;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Application name reported to the engine (used in its log file names).
    pub app_name: String,
    pub distribution_name: String,
    pub distribution_code_name: String,
    pub distribution_version: String,

    /// Engine log threshold (0 info, 1 warning, 2 error, 3 fatal).
    /// `None` keeps the engine default.
    pub min_log_level: Option<i32>,
    /// Directory for engine log files. `None` keeps the engine default.
    pub log_dir: Option<PathBuf>,

    /// Path of the librime shared library. `None` tries the platform's
    /// usual file names.
    pub library: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            app_name: "rime.emacs".to_string(),
            distribution_name: "Rime".to_string(),
            distribution_code_name: "emacs-rime".to_string(),
            distribution_version: "0.1.0".to_string(),
            min_log_level: None,
            log_dir: None,
            library: None,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Build the engine traits for one `start` call.
    pub fn traits(&self, shared_data_dir: &str, user_data_dir: &str) -> Result<TraitsRecord> {
        TraitsRecord::new(self, shared_data_dir, user_data_dir)
    }
}

/// Owns the C strings a `RimeTraits` points at.
///
/// The engine only reads the traits during `setup`/`initialize`, so the
/// record lives for the duration of `start`.
#[derive(Debug)]
pub struct TraitsRecord {
    shared_data_dir: CString,
    user_data_dir: CString,
    distribution_name: CString,
    distribution_code_name: CString,
    distribution_version: CString,
    app_name: CString,
    log_dir: Option<CString>,
    min_log_level: Option<c_int>,
}

impl TraitsRecord {
    fn new(config: &BridgeConfig, shared_data_dir: &str, user_data_dir: &str) -> Result<Self> {
        let log_dir = match &config.log_dir {
            Some(dir) => {
                let dir = dir
                    .to_str()
                    .ok_or_else(|| BridgeError::Config("log_dir is not valid UTF-8".to_string()))?;
                host_to_native(Some(dir))?
            }
            None => None,
        };

        Ok(Self {
            shared_data_dir: required(shared_data_dir)?,
            user_data_dir: required(user_data_dir)?,
            distribution_name: required(&config.distribution_name)?,
            distribution_code_name: required(&config.distribution_code_name)?,
            distribution_version: required(&config.distribution_version)?,
            app_name: required(&config.app_name)?,
            log_dir,
            min_log_level: config.min_log_level,
        })
    }

    /// A `RimeTraits` view borrowing this record's strings.
    pub fn as_traits(&self) -> RimeTraits {
        let mut traits = RimeTraits::new();
        traits.shared_data_dir = self.shared_data_dir.as_ptr();
        traits.user_data_dir = self.user_data_dir.as_ptr();
        traits.distribution_name = self.distribution_name.as_ptr();
        traits.distribution_code_name = self.distribution_code_name.as_ptr();
        traits.distribution_version = self.distribution_version.as_ptr();
        traits.app_name = self.app_name.as_ptr();
        if let Some(dir) = &self.log_dir {
            traits.log_dir = dir.as_ptr();
        }
        if let Some(level) = self.min_log_level {
            traits.min_log_level = level;
        }
        traits
    }

    pub fn shared_data_dir(&self) -> &str {
        self.shared_data_dir.to_str().unwrap_or_default()
    }

    pub fn user_data_dir(&self) -> &str {
        self.user_data_dir.to_str().unwrap_or_default()
    }
}

fn required(value: &str) -> Result<CString> {
    host_to_native(Some(value))?.ok_or(BridgeError::InteriorNul(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_defaults_match_distribution() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.app_name, "rime.emacs");
        assert_eq!(cfg.distribution_name, "Rime");
        assert_eq!(cfg.distribution_code_name, "emacs-rime");
        assert_eq!(cfg.distribution_version, "0.1.0");
        assert!(cfg.library.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = BridgeConfig::from_toml_str(
            r#"
            app_name = "rime.test"
            library = "/opt/rime/lib/librime.so.1"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.app_name, "rime.test");
        assert_eq!(cfg.distribution_name, "Rime");
        assert_eq!(cfg.library, Some(PathBuf::from("/opt/rime/lib/librime.so.1")));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut cfg = BridgeConfig::default();
        cfg.min_log_level = Some(2);
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(BridgeConfig::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        match BridgeConfig::from_toml_str("app_name = 3") {
            Err(BridgeError::Config(_)) => {}
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_traits_point_at_record() {
        let cfg = BridgeConfig::default();
        let record = cfg.traits("/usr/share/rime-data", "/home/u/.rime").unwrap();
        let traits = record.as_traits();
        let read = |p| unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_string();
        assert_eq!(read(traits.shared_data_dir), "/usr/share/rime-data");
        assert_eq!(read(traits.user_data_dir), "/home/u/.rime");
        assert_eq!(read(traits.app_name), "rime.emacs");
        assert_eq!(read(traits.distribution_code_name), "emacs-rime");
        assert!(traits.log_dir.is_null());
        assert_eq!(record.user_data_dir(), "/home/u/.rime");
    }

    #[test]
    fn test_nul_in_directory_rejected() {
        let cfg = BridgeConfig::default();
        assert!(cfg.traits("/usr/share\0", "/home").is_err());
    }
}
