pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli_args::CliConfig;

pub const DEFAULT_API_ENDPOINT: &str = "https://minhareceita.org";
pub const DEFAULT_SAMPLE_CNPJ: &str = "49752997000125";
pub const DEFAULT_OUTPUT_PATH: &str = "./output";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[cfg(feature = "cli")]
mod cli_args {
    use super::*;
    use crate::domain::ports::ConfigProvider;
    use crate::utils::error::Result;
    use crate::utils::validation::{self, Validate};
    use clap::Parser;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "cnpj-enricher")]
    #[command(about = "Enrich a CSV with CNPJ registry data, one lookup per row")]
    pub struct CliConfig {
        /// CSV file with a `cnpj` column
        #[arg(required_unless_present = "list_fields")]
        pub input: Option<String>,

        /// Optional TOML configuration; replaces the lookup/output flags below
        #[arg(short, long)]
        pub config: Option<String>,

        #[arg(long, default_value = DEFAULT_API_ENDPOINT)]
        pub api_endpoint: String,

        #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
        pub output_path: String,

        /// Identifier used to discover the available fields
        #[arg(long, default_value = DEFAULT_SAMPLE_CNPJ)]
        pub sample_cnpj: String,

        /// Fields to add to each row (default: every discovered field)
        #[arg(long, value_delimiter = ',')]
        pub fields: Vec<String>,

        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECONDS)]
        pub timeout_seconds: u64,

        /// Print the discovered fields and exit
        #[arg(long)]
        pub list_fields: bool,

        /// Case-insensitive substring filter for --list-fields
        #[arg(long)]
        pub filter: Option<String>,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON")]
        pub log_json: bool,

        #[arg(long, help = "Log CPU and memory usage")]
        pub monitor: bool,
    }

    impl ConfigProvider for CliConfig {
        fn api_endpoint(&self) -> &str {
            &self.api_endpoint
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn sample_identifier(&self) -> &str {
            &self.sample_cnpj
        }

        fn request_timeout(&self) -> Duration {
            Duration::from_secs(self.timeout_seconds)
        }

        fn selected_fields(&self) -> &[String] {
            &self.fields
        }

        fn monitoring_enabled(&self) -> bool {
            self.monitor
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_url("api_endpoint", &self.api_endpoint)?;
            validation::validate_path("output_path", &self.output_path)?;
            validation::validate_identifier("sample_cnpj", &self.sample_cnpj)?;
            validation::validate_positive_number("timeout_seconds", self.timeout_seconds, 1)?;
            validation::validate_field_keys("fields", &self.fields)?;
            if let Some(input) = &self.input {
                validation::validate_path("input", input)?;
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_defaults() {
            let config = CliConfig::parse_from(["cnpj-enricher", "empresas.csv"]);
            assert_eq!(config.input.as_deref(), Some("empresas.csv"));
            assert_eq!(config.api_endpoint, DEFAULT_API_ENDPOINT);
            assert_eq!(config.request_timeout(), Duration::from_secs(30));
            assert!(config.selected_fields().is_empty());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_parse_field_list() {
            let config = CliConfig::parse_from([
                "cnpj-enricher",
                "empresas.csv",
                "--fields",
                "razao_social,uf",
                "--timeout-seconds",
                "5",
            ]);
            assert_eq!(config.fields, vec!["razao_social", "uf"]);
            assert_eq!(config.request_timeout(), Duration::from_secs(5));
        }

        #[test]
        fn test_list_fields_does_not_need_input() {
            let config = CliConfig::try_parse_from(["cnpj-enricher", "--list-fields", "--filter", "mei"]);
            assert!(config.is_ok());
            assert!(CliConfig::try_parse_from(["cnpj-enricher"]).is_err());
        }

        #[test]
        fn test_validate_rejects_bad_values() {
            let mut config = CliConfig::parse_from(["cnpj-enricher", "empresas.csv"]);
            config.timeout_seconds = 0;
            assert!(config.validate().is_err());

            let mut config = CliConfig::parse_from(["cnpj-enricher", "empresas.csv"]);
            config.api_endpoint = "ftp://minhareceita.org".to_string();
            assert!(config.validate().is_err());
        }
    }
}
