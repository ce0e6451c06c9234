use crate::domain::model::Phase;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("Malformed CSV input: {message}")]
    MalformedInput { message: String },

    #[error("CSV input has no data rows")]
    EmptyInput,

    #[error("CSV header is missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("Invalid identifier '{identifier}': expected 14 digits, found {digits}")]
    InvalidIdentifier { identifier: String, digits: usize },

    #[error("Lookup failed with HTTP status {status}")]
    LookupFailed { status: u16 },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Could not decode lookup response: {message}")]
    Decode { message: String },

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid job transition from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, EnrichError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Lookup,
    Configuration,
    System,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Row-level, the run continues.
    Low,
    /// Remote failure that may succeed on a later run.
    Medium,
    /// The run cannot proceed with the given input or settings.
    High,
    Critical,
}

impl EnrichError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EnrichError::MalformedInput { .. }
            | EnrichError::EmptyInput
            | EnrichError::MissingColumn { .. }
            | EnrichError::InvalidIdentifier { .. } => ErrorCategory::Input,
            EnrichError::LookupFailed { .. }
            | EnrichError::Transport(_)
            | EnrichError::Decode { .. } => ErrorCategory::Lookup,
            EnrichError::ConfigError { .. }
            | EnrichError::InvalidConfigValueError { .. }
            | EnrichError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EnrichError::Csv(_) | EnrichError::Io(_) => ErrorCategory::System,
            EnrichError::InvalidTransition { .. } | EnrichError::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EnrichError::InvalidIdentifier { .. } => ErrorSeverity::Low,
            EnrichError::LookupFailed { .. }
            | EnrichError::Transport(_)
            | EnrichError::Decode { .. } => ErrorSeverity::Medium,
            EnrichError::MalformedInput { .. }
            | EnrichError::EmptyInput
            | EnrichError::MissingColumn { .. }
            | EnrichError::ConfigError { .. }
            | EnrichError::InvalidConfigValueError { .. }
            | EnrichError::ConfigValidationError { .. } => ErrorSeverity::High,
            EnrichError::Csv(_)
            | EnrichError::Io(_)
            | EnrichError::InvalidTransition { .. }
            | EnrichError::ProcessingError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Errors that only cost one row its enrichment.
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            EnrichError::InvalidIdentifier { .. }
                | EnrichError::LookupFailed { .. }
                | EnrichError::Transport(_)
                | EnrichError::Decode { .. }
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EnrichError::MalformedInput { .. } => {
                "Erro ao ler o CSV. Verifique se o arquivo está bem formatado.".to_string()
            }
            EnrichError::EmptyInput => "O arquivo CSV está vazio.".to_string(),
            EnrichError::MissingColumn { column } => format!(
                "Não encontrei a coluna '{}' no cabeçalho do CSV. Certifique-se de que existe uma coluna com o nome exato '{}'.",
                column, column
            ),
            EnrichError::InvalidIdentifier { digits, .. } => format!(
                "O CNPJ precisa ter exatamente 14 dígitos (atualmente tem {}).",
                digits
            ),
            EnrichError::LookupFailed { status } => format!(
                "Erro ao buscar dados (HTTP {}). Verifique o CNPJ.",
                status
            ),
            EnrichError::Transport(_) | EnrichError::Decode { .. } => {
                "Não foi possível buscar os dados. Tente novamente mais tarde.".to_string()
            }
            EnrichError::ConfigError { .. }
            | EnrichError::InvalidConfigValueError { .. }
            | EnrichError::ConfigValidationError { .. } => {
                format!("Configuração inválida: {}", self)
            }
            EnrichError::Csv(_)
            | EnrichError::Io(_)
            | EnrichError::InvalidTransition { .. }
            | EnrichError::ProcessingError { .. } => {
                "Ocorreu um erro ao processar o CSV. Verifique o arquivo e tente novamente."
                    .to_string()
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Confira o cabeçalho e a formatação do arquivo CSV.",
            ErrorCategory::Lookup => "Verifique a conexão e o endpoint do serviço de consulta.",
            ErrorCategory::Configuration => "Revise os parâmetros da linha de comando ou o arquivo TOML.",
            ErrorCategory::System => "Verifique permissões e espaço em disco no diretório de saída.",
            ErrorCategory::Processing => "Execute novamente com --verbose e reporte o log.",
        }
    }
}
