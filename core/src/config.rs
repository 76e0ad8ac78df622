//! Dispatcher configuration.
//!
//! Controls the program name shown in usage lines, which flags request help,
//! and the exit codes used for user and declaration errors. Every field has a
//! default, so a partial YAML file is enough.
//!
//! # Example YAML
//!
//! ```yaml
//! program_name: argcommand-demo
//! help_flags: ["-h", "--help"]
//! usage_exit_code: 2
//! defect_exit_code: 70
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grammar::{DEFAULT_HELP_FLAGS, GrammarOptions};

/// Exit code for invalid user input.
pub const USAGE_EXIT_CODE: i32 = 2;

/// Exit code for declaration defects (`EX_SOFTWARE`).
pub const DEFECT_EXIT_CODE: i32 = 70;

/// Settings applied by the [`Dispatcher`](crate::Dispatcher).
///
/// # Examples
///
/// ```
/// use argcommand_core::DispatchConfig;
///
/// let config: DispatchConfig = serde_yaml::from_str("program_name: tool\n").unwrap();
/// assert_eq!(config.program_name.as_deref(), Some("tool"));
/// assert_eq!(config.usage_exit_code, 2);
/// assert_eq!(config.help_flags, vec!["-h", "--help"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Name shown in usage lines. Defaults to the root command name.
    pub program_name: Option<String>,
    /// Flags that request help at any level. Empty disables help flags.
    pub help_flags: Vec<String>,
    /// Exit code for parse errors.
    pub usage_exit_code: i32,
    /// Exit code for schema and binding errors.
    pub defect_exit_code: i32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            program_name: None,
            help_flags: DEFAULT_HELP_FLAGS.iter().map(|f| (*f).to_string()).collect(),
            usage_exit_code: USAGE_EXIT_CODE,
            defect_exit_code: DEFECT_EXIT_CODE,
        }
    }
}

impl DispatchConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](ConfigError::IoError) if the file cannot be read,
    /// or [`YamlError`](ConfigError::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](ConfigError::IoError) if the file cannot be
    /// written, or [`YamlError`](ConfigError::YamlError) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Sets the program name.
    pub fn with_program_name(mut self, name: &str) -> Self {
        self.program_name = Some(name.to_string());
        self
    }

    /// Grammar options derived from this configuration.
    pub fn grammar_options(&self) -> GrammarOptions {
        GrammarOptions {
            help_flags: self.help_flags.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
program_name: demo
help_flags:
  - "-?"
  - --usage
usage_exit_code: 64
defect_exit_code: 99
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: DispatchConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.program_name.as_deref(), Some("demo"));
        assert_eq!(config.help_flags, vec!["-?", "--usage"]);
        assert_eq!(config.usage_exit_code, 64);
        assert_eq!(config.defect_exit_code, 99);
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: DispatchConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, DispatchConfig::default());
        assert_eq!(config.grammar_options(), GrammarOptions::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("argcommand.yml");
        let config = DispatchConfig::default().with_program_name("tool");

        config.save(&path).unwrap();
        assert_eq!(DispatchConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DispatchConfig::load(dir.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"usage_exit_code: [not, a, number]\n").unwrap();
        let err = DispatchConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::YamlError(_)));
    }
}
