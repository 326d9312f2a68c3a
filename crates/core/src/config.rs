//! Solver configuration.
//!
//! Both solver configurations deserialize from YAML and are validated after
//! parsing:
//!
//! ```yaml
//! variant: cfr_plus
//! show_progress: true
//! ```

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

/// Regret-accumulation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CfrVariant {
    /// Keep negative regret; floor only when deriving the strategy.
    #[default]
    Vanilla,
    /// Floor accumulated regret at zero after every update.
    CfrPlus,
}

impl std::fmt::Display for CfrVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vanilla => write!(f, "CFR"),
            Self::CfrPlus => write!(f, "CFR+"),
        }
    }
}

/// Configuration of the extensive-form [`CfrSolver`](crate::cfr::CfrSolver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CfrConfig {
    pub variant: CfrVariant,
    /// Draw spinners and progress bars on stderr.
    pub show_progress: bool,
}

impl CfrConfig {
    #[must_use]
    pub fn vanilla() -> Self {
        Self {
            variant: CfrVariant::Vanilla,
            show_progress: false,
        }
    }

    #[must_use]
    pub fn cfr_plus() -> Self {
        Self {
            variant: CfrVariant::CfrPlus,
            show_progress: false,
        }
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_yaml(path.as_ref())
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(ConfigError::Parse)
    }
}

/// Configuration of the sequence-form self-play
/// [`SequenceFormSolver`](crate::sequence::SequenceFormSolver).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SequenceFormConfig {
    pub variant: CfrVariant,
    /// Iterate `t` enters the average strategy with weight `t^gamma`.
    pub averaging_exponent: f64,
    /// Alternate player updates instead of updating both simultaneously.
    pub alternate: bool,
    pub show_progress: bool,
}

impl Default for SequenceFormConfig {
    fn default() -> Self {
        Self::vanilla()
    }
}

impl SequenceFormConfig {
    /// CFR: uniform averaging, simultaneous updates.
    #[must_use]
    pub fn vanilla() -> Self {
        Self {
            variant: CfrVariant::Vanilla,
            averaging_exponent: 0.0,
            alternate: false,
            show_progress: false,
        }
    }

    /// CFR+ (Tammelin 2014): floored regrets, linear averaging, alternating
    /// updates.
    #[must_use]
    pub fn cfr_plus() -> Self {
        Self {
            variant: CfrVariant::CfrPlus,
            averaging_exponent: 1.0,
            alternate: true,
            show_progress: false,
        }
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Self = load_yaml(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or the averaging exponent is
    /// negative or not finite.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAveragingExponent`] for a negative or
    /// non-finite exponent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.averaging_exponent.is_finite() || self.averaging_exponent < 0.0 {
            return Err(ConfigError::InvalidAveragingExponent(self.averaging_exponent));
        }
        Ok(())
    }
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    serde_yaml::from_str(&content).map_err(ConfigError::Parse)
}

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(std::path::PathBuf, #[source] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid averaging_exponent: {0} (must be finite and >= 0)")]
    InvalidAveragingExponent(f64),
}
