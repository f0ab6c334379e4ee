//! Request signing for the Coinbase Exchange API
//!
//! `CB-ACCESS-SIGN` is the base64 HMAC-SHA256 of
//! `timestamp + METHOD + request_path + body`, keyed with the base64-decoded
//! API secret.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::ExchangeConfig;
use crate::gateway::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// Compute the `CB-ACCESS-SIGN` header value
pub fn sign_request(
    secret_b64: &str,
    timestamp: &str,
    method: &str,
    request_path: &str,
    body: &str,
) -> Result<String, GatewayError> {
    let key = STANDARD
        .decode(secret_b64)
        .map_err(|e| GatewayError::Auth(format!("API secret is not valid base64: {}", e)))?;
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| GatewayError::Auth(format!("invalid HMAC key: {}", e)))?;

    mac.update(timestamp.as_bytes());
    mac.update(method.to_uppercase().as_bytes());
    mac.update(request_path.as_bytes());
    mac.update(body.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// API credentials container
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
    passphrase: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            passphrase: passphrase.into(),
        }
    }

    /// Credentials from the exchange section, `None` unless all three are set
    pub fn from_config(config: &ExchangeConfig) -> Option<Self> {
        match (&config.api_key, &config.api_secret, &config.api_passphrase) {
            (Some(key), Some(secret), Some(passphrase))
                if !key.is_empty() && !secret.is_empty() =>
            {
                Some(Self::new(key, secret, passphrase))
            }
            _ => None,
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    pub fn sign(
        &self,
        timestamp: &str,
        method: &str,
        request_path: &str,
        body: &str,
    ) -> Result<String, GatewayError> {
        sign_request(&self.api_secret, timestamp, method, request_path, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "c2VjcmV0LWtleS1ieXRlcw==";

    #[test]
    fn test_signature_is_base64_sha256() {
        let sig = sign_request(SECRET, "1700000000", "GET", "/accounts", "").unwrap();
        let raw = STANDARD.decode(&sig).unwrap();
        assert_eq!(raw.len(), 32);
    }

    #[test]
    fn test_signature_is_deterministic() {
        let a = sign_request(SECRET, "1700000000", "POST", "/orders", "{}").unwrap();
        let b = sign_request(SECRET, "1700000000", "post", "/orders", "{}").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_covers_every_component() {
        let base = sign_request(SECRET, "1", "GET", "/accounts", "").unwrap();
        assert_ne!(base, sign_request(SECRET, "2", "GET", "/accounts", "").unwrap());
        assert_ne!(base, sign_request(SECRET, "1", "POST", "/accounts", "").unwrap());
        assert_ne!(base, sign_request(SECRET, "1", "GET", "/orders", "").unwrap());
        assert_ne!(base, sign_request(SECRET, "1", "GET", "/accounts", "x").unwrap());
    }

    #[test]
    fn test_invalid_secret_is_auth_error() {
        let result = sign_request("not base64!!", "1", "GET", "/accounts", "");
        assert!(matches!(result, Err(GatewayError::Auth(_))));
    }

    #[test]
    fn test_credentials_require_all_parts() {
        let mut config = ExchangeConfig::default();
        assert!(Credentials::from_config(&config).is_none());

        config.api_key = Some("key".into());
        config.api_secret = Some(SECRET.into());
        assert!(Credentials::from_config(&config).is_none());

        config.api_passphrase = Some("pass".into());
        let creds = Credentials::from_config(&config).unwrap();
        assert_eq!(creds.api_key(), "key");
        assert_eq!(creds.passphrase(), "pass");
    }

    #[test]
    fn test_debug_hides_secret() {
        let creds = Credentials::new("key", SECRET, "pass");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains(SECRET));
        assert!(!printed.contains("pass\""));
    }
}
