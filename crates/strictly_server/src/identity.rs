//! Display-name validation.

use crate::config::ServerConfig;
use crate::error::GatewayError;
use crate::protocol::Identity;
use tracing::{debug, instrument};

fn allowed(ch: char) -> bool {
    ch.is_alphanumeric() || ch == ' ' || ch == '_' || ch == '-'
}

/// Validates a requested name, returning it trimmed.
///
/// # Errors
///
/// Returns [`GatewayError::IdentityInvalid`] for empty, overlong, reserved or
/// badly-charactered names.
#[instrument(skip(config))]
pub fn validate_name(raw: &str, config: &ServerConfig) -> Result<Identity, GatewayError> {
    let name = raw.trim();
    let invalid = |reason: String| {
        debug!(%reason, "Name refused");
        GatewayError::IdentityInvalid { reason }
    };

    if name.is_empty() {
        return Err(invalid("Name cannot be empty".to_string()));
    }
    let max = *config.max_name_len();
    if name.chars().count() > max {
        return Err(invalid(format!("Name must be at most {} characters", max)));
    }
    if !name.chars().all(allowed) {
        return Err(invalid(
            "Name may only contain letters, digits, spaces, '_' or '-'".to_string(),
        ));
    }
    if name.eq_ignore_ascii_case(config.opponent_name()) {
        return Err(invalid(format!("'{}' is reserved", name)));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig::default()
    }

    #[test]
    fn test_trims_valid_name() {
        assert_eq!(validate_name("  alice  ", &config()), Ok("alice".to_string()));
        assert_eq!(validate_name("Bob_2-x y", &config()), Ok("Bob_2-x y".to_string()));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            validate_name("   ", &config()),
            Err(GatewayError::IdentityInvalid { .. })
        ));
    }

    #[test]
    fn test_rejects_overlong() {
        let name = "a".repeat(21);
        assert!(validate_name(&name, &config()).is_err());
        let name = "a".repeat(20);
        assert!(validate_name(&name, &config()).is_ok());
    }

    #[test]
    fn test_rejects_markup() {
        assert!(validate_name("<script>", &config()).is_err());
        assert!(validate_name("a;b", &config()).is_err());
    }

    #[test]
    fn test_rejects_opponent_name() {
        assert!(validate_name("computer", &config()).is_err());
    }
}
