//! `rwlz.toml` compiler configuration.
//!
//! Every section and field is optional; anything missing takes its default.
//!
//! # Example
//!
//! ```toml
//! [codegen]
//! module_name = "rwlz_module"
//! target_triple = "x86_64-unknown-linux-gnu"
//!
//! [diagnostics]
//! warnings_as_errors = false
//! format = "human"
//!
//! [toolchain]
//! driver = "clang"
//! args = ["-no-pie"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up next to a source file.
pub const CONFIG_FILE_NAME: &str = "rwlz.toml";

/// Errors that can occur when loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    pub codegen: CodegenConfig,
    pub diagnostics: DiagnosticsConfig,
    pub toolchain: ToolchainConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodegenConfig {
    /// Name written as the IR module id and source file name.
    pub module_name: String,
    /// Emitted as `target triple = ...` when set.
    pub target_triple: Option<String>,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            module_name: "rwlz_module".to_string(),
            target_triple: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiagnosticsConfig {
    /// Fail a compilation that produced only warnings.
    pub warnings_as_errors: bool,
    pub format: DiagnosticFormat,
}

/// How diagnostics are printed by the command-line driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    /// C compiler driver that assembles and links the IR.
    pub driver: String,
    /// Extra arguments passed to the driver before the input file.
    pub args: Vec<String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            driver: "clang".to_string(),
            args: vec!["-no-pie".to_string()],
        }
    }
}

impl CompilerConfig {
    /// Parse a configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: CompilerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a file path.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// The configuration for compiling `source`: an explicit path wins,
    /// then `rwlz.toml` beside the source, then the defaults.
    pub fn discover(explicit: Option<&Path>, source: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        let beside = source
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(CONFIG_FILE_NAME);
        if beside.is_file() {
            Self::from_path(&beside)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.codegen.module_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "codegen.module_name",
                reason: "must not be empty".to_string(),
            });
        }
        if self.toolchain.driver.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "toolchain.driver",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = CompilerConfig::from_str("").unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert_eq!(config.codegen.module_name, "rwlz_module");
        assert_eq!(config.toolchain.driver, "clang");
        assert_eq!(config.toolchain.args, ["-no-pie"]);
        assert_eq!(config.diagnostics.format, DiagnosticFormat::Human);
    }

    #[test]
    fn test_full_config() {
        let content = r#"
            [codegen]
            module_name = "mod_a"
            target_triple = "aarch64-apple-darwin"

            [diagnostics]
            warnings_as_errors = true
            format = "json"

            [toolchain]
            driver = "cc"
            args = []
        "#;

        let config = CompilerConfig::from_str(content).unwrap();
        assert_eq!(config.codegen.module_name, "mod_a");
        assert_eq!(
            config.codegen.target_triple.as_deref(),
            Some("aarch64-apple-darwin")
        );
        assert!(config.diagnostics.warnings_as_errors);
        assert_eq!(config.diagnostics.format, DiagnosticFormat::Json);
        assert_eq!(config.toolchain.driver, "cc");
        assert!(config.toolchain.args.is_empty());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = CompilerConfig::from_str("[toolchain]\ndriver = \"gcc\"\n").unwrap();
        assert_eq!(config.toolchain.driver, "gcc");
        assert_eq!(config.toolchain.args, ["-no-pie"]);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = CompilerConfig::from_str("[codegen]\noptimize = true\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_empty_module_name_is_rejected() {
        let result = CompilerConfig::from_str("[codegen]\nmodule_name = \"\"\n");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "codegen.module_name",
                ..
            })
        ));
    }

    #[test]
    fn test_discover_prefers_file_beside_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("main.rwlz");
        std::fs::write(&source, "void main() { }").unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[codegen]\nmodule_name = \"beside\"\n",
        )
        .unwrap();

        let config = CompilerConfig::discover(None, &source).unwrap();
        assert_eq!(config.codegen.module_name, "beside");
    }

    #[test]
    fn test_discover_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("main.rwlz");
        let config = CompilerConfig::discover(None, &source).unwrap();
        assert_eq!(config, CompilerConfig::default());
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let result = CompilerConfig::discover(Some(&missing), &dir.path().join("a.rwlz"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
