//! Mutator configuration

use crate::error::{DomainError, ErrorCode, Result};
use crate::native::WriteFlags;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Prefix of the environment variables read by [`MutatorConfig::from_env`]
pub const ENV_PREFIX: &str = "PAGEWRIGHT_";

/// Settings shared by every operation of a [`crate::DocumentMutator`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutatorConfig {
    /// Back up a document before rewriting it in place
    pub create_backup: bool,
    /// Leave the backup on disk after a successful operation
    pub keep_backup: bool,
    /// Appended to the file name to form the backup path
    pub backup_suffix: String,
    /// Check that outputs exist and are non-empty after writing
    pub verify_output: bool,
    /// Flags used by optimize when the caller passes none; fields missing
    /// from a JSON object keep their defaults
    #[serde(deserialize_with = "optimize_flags_over_defaults")]
    pub optimize_flags: WriteFlags,
}

impl Default for MutatorConfig {
    fn default() -> Self {
        Self {
            create_backup: true,
            keep_backup: false,
            backup_suffix: ".bak".to_string(),
            verify_output: true,
            optimize_flags: WriteFlags {
                compress_streams: true,
                remove_unreferenced: true,
                object_streams: false,
                linearize: false,
            },
        }
    }
}

impl MutatorConfig {
    pub fn with_backup(mut self, create_backup: bool) -> Self {
        self.create_backup = create_backup;
        self
    }

    pub fn with_keep_backup(mut self, keep_backup: bool) -> Self {
        self.keep_backup = keep_backup;
        self
    }

    pub fn with_backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = suffix.into();
        self
    }

    pub fn with_verification(mut self, verify_output: bool) -> Self {
        self.verify_output = verify_output;
        self
    }

    pub fn with_optimize_flags(mut self, flags: WriteFlags) -> Self {
        self.optimize_flags = flags;
        self
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|err| {
            DomainError::invalid_argument(format!("Invalid configuration: {err}"))
        })?;
        config.validate()
    }

    /// Load a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|err| {
            let code = match err.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
                _ => ErrorCode::IoFailure,
            };
            DomainError::io(code, path, &err)
        })?;
        Self::from_json(&json).map_err(|error| error.with_path(path))
    }

    /// Defaults with `PAGEWRIGHT_*` environment overrides applied
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `PAGEWRIGHT_*` environment overrides on top of `self`
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up by full variable name
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(value) = var("CREATE_BACKUP") {
            self.create_backup = parse_bool("CREATE_BACKUP", &value)?;
        }
        if let Some(value) = var("KEEP_BACKUP") {
            self.keep_backup = parse_bool("KEEP_BACKUP", &value)?;
        }
        if let Some(value) = var("BACKUP_SUFFIX") {
            self.backup_suffix = value;
        }
        if let Some(value) = var("VERIFY_OUTPUT") {
            self.verify_output = parse_bool("VERIFY_OUTPUT", &value)?;
        }
        if let Some(value) = var("COMPRESS_STREAMS") {
            self.optimize_flags.compress_streams = parse_bool("COMPRESS_STREAMS", &value)?;
        }
        if let Some(value) = var("REMOVE_UNREFERENCED") {
            self.optimize_flags.remove_unreferenced = parse_bool("REMOVE_UNREFERENCED", &value)?;
        }
        self.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.backup_suffix.trim().is_empty() || self.backup_suffix.contains(['/', '\\']) {
            return Err(DomainError::invalid_argument(format!(
                "Invalid backup suffix '{}'",
                self.backup_suffix
            )));
        }
        Ok(self)
    }
}

fn optimize_flags_over_defaults<'de, D>(deserializer: D) -> std::result::Result<WriteFlags, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct PartialFlags {
        compress_streams: Option<bool>,
        remove_unreferenced: Option<bool>,
        object_streams: Option<bool>,
        linearize: Option<bool>,
    }

    let partial = PartialFlags::deserialize(deserializer)?;
    let defaults = MutatorConfig::default().optimize_flags;
    Ok(WriteFlags {
        compress_streams: partial.compress_streams.unwrap_or(defaults.compress_streams),
        remove_unreferenced: partial
            .remove_unreferenced
            .unwrap_or(defaults.remove_unreferenced),
        object_streams: partial.object_streams.unwrap_or(defaults.object_streams),
        linearize: partial.linearize.unwrap_or(defaults.linearize),
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DomainError::invalid_argument(format!(
            "{ENV_PREFIX}{name} must be a boolean, got '{value}'"
        ))),
    }
}
