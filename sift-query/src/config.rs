//! Configuration file parsing for `sift.toml`.
//!
//! ```toml
//! [registry]
//! expert_mode = false
//!
//! [registry.default_template]
//! column = "filename"
//! operator = "contains"
//! value = ""
//!
//! [slots.documents]
//! column = "filename"
//! operator = "contains"
//! value = "${SIFT_DEFAULT_QUERY}"
//!
//! [slots.metadata]
//! expert_mode = true
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::column::FilterColumn;
use crate::error::{ErrorCode, FilterError, FilterResult};
use crate::operator::FilterOperator;
use crate::registry::{RegistryConfig, SlotSettings};
use crate::slot::ExpressionTemplate;
use crate::value::FilterValue;

/// Main configuration structure for `sift.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SiftConfig {
    /// Registry-wide settings.
    #[serde(default)]
    pub registry: RegistrySection,

    /// Per-slot settings, keyed by slot name.
    #[serde(default)]
    pub slots: HashMap<String, SlotSection>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SiftConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> FilterResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FilterError::new(
                ErrorCode::ConfigurationIo,
                format!("Failed to read config file '{}'", path.display()),
            )
            .with_source(e)
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> FilterResult<Self> {
        let expanded = expand_env_vars(content);

        toml::from_str(&expanded).map_err(|e| {
            FilterError::invalid_config(format!("Invalid sift.toml: {}", e.message())).with_source(e)
        })
    }

    /// Build the registry settings described by this file.
    ///
    /// A slot section overrides the registry default template field by field.
    pub fn registry_config(&self) -> RegistryConfig {
        let default_template = self.registry.default_template.clone().unwrap_or_default();

        let slots = self
            .slots
            .iter()
            .map(|(name, section)| (name.clone(), section.settings(&default_template)))
            .collect();

        RegistryConfig {
            default_template,
            expert_mode: self.registry.expert_mode,
            slots,
        }
    }
}

/// The `[registry]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySection {
    /// Default editing mode for every slot.
    #[serde(default)]
    pub expert_mode: bool,

    /// Template for slots without their own section.
    #[serde(default)]
    pub default_template: Option<ExpressionTemplate>,
}

/// A `[slots.<name>]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SlotSection {
    /// Column of new expressions.
    pub column: Option<FilterColumn>,
    /// Operator of new expressions.
    pub operator: Option<FilterOperator>,
    /// Value of new expressions.
    pub value: Option<FilterValue>,
    /// Editing mode override.
    pub expert_mode: Option<bool>,
}

impl SlotSection {
    fn settings(&self, fallback: &ExpressionTemplate) -> SlotSettings {
        SlotSettings {
            template: ExpressionTemplate {
                column: self.column.clone().unwrap_or_else(|| fallback.column.clone()),
                operator: self.operator.unwrap_or(fallback.operator),
                value: self.value.clone().unwrap_or_else(|| fallback.value.clone()),
            },
            expert_mode: self.expert_mode,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Structured JSON lines.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line human-readable output.
    Compact,
}

impl LogFormat {
    /// Name of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level (trace, debug, info, warn, error).
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

/// Replace `${VAR}` with the variable's value. Unset variables are left as is.
fn expand_env_vars(content: &str) -> String {
    let re = match regex_lite::Regex::new(r"\$\{([^}]+)\}") {
        Ok(re) => re,
        Err(_) => return content.to_string(),
    };

    re.replace_all(content, |caps: &regex_lite::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}
