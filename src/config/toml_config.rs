use crate::config::{
    DEFAULT_API_ENDPOINT, DEFAULT_OUTPUT_PATH, DEFAULT_SAMPLE_CNPJ, DEFAULT_TIMEOUT_SECONDS,
};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EnrichError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// File-based settings.
///
/// ```toml
/// [lookup]
/// endpoint = "https://minhareceita.org"
/// sample_cnpj = "49752997000125"
/// timeout_seconds = 30
///
/// [selection]
/// fields = ["razao_social", "uf", "opcao_pelo_mei"]
///
/// [output]
/// output_path = "${HOME}/enriquecidos"
///
/// [monitoring]
/// enabled = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_sample_cnpj")]
    pub sample_cnpj: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub output_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn default_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

fn default_sample_cnpj() -> String {
    DEFAULT_SAMPLE_CNPJ.to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_output_path() -> String {
    DEFAULT_OUTPUT_PATH.to_string()
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            sample_cnpj: default_sample_cnpj(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
        }
    }
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EnrichError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unknown variables are left as is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EnrichError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl ConfigProvider for TomlConfig {
    fn api_endpoint(&self) -> &str {
        &self.lookup.endpoint
    }

    fn output_path(&self) -> &str {
        &self.output.output_path
    }

    fn sample_identifier(&self) -> &str {
        &self.lookup.sample_cnpj
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup.timeout_seconds)
    }

    fn selected_fields(&self) -> &[String] {
        &self.selection.fields
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("lookup.endpoint", &self.lookup.endpoint)?;
        validation::validate_identifier("lookup.sample_cnpj", &self.lookup.sample_cnpj)?;
        validation::validate_positive_number("lookup.timeout_seconds", self.lookup.timeout_seconds, 1)?;
        validation::validate_path("output.output_path", &self.output.output_path)?;
        validation::validate_field_keys("selection.fields", &self.selection.fields)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.api_endpoint(), DEFAULT_API_ENDPOINT);
        assert_eq!(config.sample_identifier(), DEFAULT_SAMPLE_CNPJ);
        assert_eq!(config.output_path(), DEFAULT_OUTPUT_PATH);
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_file() {
        let config = TomlConfig::from_toml_str(
            r#"
[lookup]
endpoint = "http://localhost:9000/cnpj"
timeout_seconds = 3

[selection]
fields = ["razao_social", "opcao_pelo_mei"]

[output]
output_path = "/tmp/enriquecidos"

[monitoring]
enabled = true
"#,
        )
        .unwrap();

        assert_eq!(config.api_endpoint(), "http://localhost:9000/cnpj");
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.selected_fields(), &["razao_social", "opcao_pelo_mei"]);
        assert_eq!(config.output_path(), "/tmp/enriquecidos");
        assert!(config.monitoring_enabled());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CNPJ_ENRICHER_TEST_OUTPUT", "/data/out");
        let config = TomlConfig::from_toml_str(
            r#"
[output]
output_path = "${CNPJ_ENRICHER_TEST_OUTPUT}"
[lookup]
endpoint = "${CNPJ_ENRICHER_UNSET_VARIABLE}"
"#,
        )
        .unwrap();
        assert_eq!(config.output_path(), "/data/out");
        assert_eq!(config.api_endpoint(), "${CNPJ_ENRICHER_UNSET_VARIABLE}");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = TomlConfig::from_toml_str("[lookup\nendpoint = 1");
        assert!(matches!(result, Err(EnrichError::ConfigValidationError { .. })));
    }
}
