use crate::domain::model::Cnpj;
use crate::utils::error::{EnrichError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(EnrichError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(EnrichError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(EnrichError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EnrichError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EnrichError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(EnrichError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_identifier(field_name: &str, value: &str) -> Result<()> {
    Cnpj::parse(value)
        .map(|_| ())
        .map_err(|e| EnrichError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

pub fn validate_field_keys(field_name: &str, keys: &[String]) -> Result<()> {
    for key in keys {
        if key.trim().is_empty() {
            return Err(EnrichError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: key.clone(),
                reason: "Field key cannot be empty or whitespace-only".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("api_endpoint", "https://minhareceita.org").is_ok());
        assert!(validate_url("api_endpoint", "http://localhost:8080").is_ok());
        assert!(validate_url("api_endpoint", "").is_err());
        assert!(validate_url("api_endpoint", "invalid-url").is_err());
        assert!(validate_url("api_endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("timeout_seconds", 30, 1).is_ok());
        assert!(validate_positive_number("timeout_seconds", 0, 1).is_err());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("sample_cnpj", "49.752.997/0001-25").is_ok());
        assert!(validate_identifier("sample_cnpj", "4975").is_err());
    }

    #[test]
    fn test_validate_field_keys() {
        let keys = vec!["uf".to_string(), "razao_social".to_string()];
        assert!(validate_field_keys("fields", &keys).is_ok());
        assert!(validate_field_keys("fields", &[" ".to_string()]).is_err());
    }
}
