//! Error types for snapkeep
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::gateway::GatewayError;

/// All error types that can end a snapkeep run
#[derive(Debug, Error)]
pub enum SnapkeepError {
    /// Failure reported by the cloud gateway
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Missing or invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML config parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for snapkeep operations
pub type Result<T> = std::result::Result<T, SnapkeepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = SnapkeepError::Config("no region selected".to_string());
        assert_eq!(err.to_string(), "Config error: no region selected");
    }

    #[test]
    fn test_gateway_error_conversion() {
        let gateway_err = GatewayError::Api {
            status: 400,
            code: "InvalidSnapshot.InUse".to_string(),
            message: "snap-1 is in use".to_string(),
        };
        let err: SnapkeepError = gateway_err.into();
        assert!(matches!(err, SnapkeepError::Gateway(_)));
        assert!(err.to_string().contains("InvalidSnapshot.InUse"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SnapkeepError = io_err.into();
        assert!(matches!(err, SnapkeepError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_err = serde_yaml::from_str::<Vec<u32>>("{ not: [a list").unwrap_err();
        let err: SnapkeepError = yaml_err.into();
        assert!(matches!(err, SnapkeepError::Yaml(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<usize> {
            Ok(3)
        }

        fn returns_err() -> Result<usize> {
            Err(SnapkeepError::Config("test".to_string()))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }
}
