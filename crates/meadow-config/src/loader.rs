//! Config file loading.

use crate::error::ConfigError;
use crate::model::MeadowConfig;
use log::{debug, info};
use std::path::Path;

/// Load a config from a JSON file, validating basic invariants.
pub fn load_config(path: impl AsRef<Path>) -> Result<MeadowConfig, ConfigError> {
    let path = path.as_ref();
    debug!("loading config (path={})", path.display());
    let raw = std::fs::read_to_string(path)?;
    let config: MeadowConfig = serde_json::from_str(&raw)?;
    validate(&config)?;
    info!("config loaded (path={})", path.display());
    Ok(config)
}

fn validate(config: &MeadowConfig) -> Result<(), ConfigError> {
    if config.model.reserved_output_tokens >= config.model.max_token_count {
        return Err(ConfigError::Invalid(format!(
            "reserved_output_tokens ({}) must be below max_token_count ({})",
            config.model.reserved_output_tokens, config.model.max_token_count
        )));
    }
    if config.script.cancel_grace_secs < 0.0 {
        return Err(ConfigError::Invalid(
            "cancel_grace_secs must be non-negative".to_string(),
        ));
    }
    if config.observation.message_retention_time <= 0.0 {
        return Err(ConfigError::Invalid(
            "message_retention_time must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::load_config;
    use crate::error::ConfigError;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_partial_config_with_defaults() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{"service": {{"endpoint": "http://agents:9000"}}}}"#
        )
        .expect("write");

        let config = load_config(file.path()).expect("load");
        assert_eq!(config.service.endpoint, "http://agents:9000");
        assert_eq!(config.service.request_timeout_secs, 10);
        assert_eq!(config.model.max_token_count, 128_000);
    }

    #[test]
    fn rejects_inverted_token_budget() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{"model": {{"max_token_count": 100, "reserved_output_tokens": 200}}}}"#
        )
        .expect("write");

        match load_config(file.path()) {
            Err(ConfigError::Invalid(message)) => {
                assert_eq!(message.contains("reserved_output_tokens"), true)
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
