//! Secure credential handling using the secrecy crate
//!
//! The destination API key and the PostgreSQL connection string are held in
//! [`SecretString`]s: memory is zeroed on drop, `Debug` output is redacted and
//! the value is only reachable through `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use profile_sync::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let api_key = secret_string("maverick-api-key".to_string());
//! assert_eq!(api_key.expose_secret(), "maverick-api-key");
//! assert!(!format!("{api_key:?}").contains("maverick-api-key"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String payload of a [`SecretString`]
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Parses the secret value into another type
    pub fn parse<F: std::str::FromStr>(&self) -> Result<F, F::Err> {
        self.0.parse()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Secret string, zeroized on drop and redacted in `Debug`
pub type SecretString = Secret<SecretValue>;

/// Wraps a plain string into a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("bearer-token".to_string());
        let debug_output = format!("{secret:?}");
        assert!(!debug_output.contains("bearer-token"));
    }

    #[test]
    fn test_secret_parse_connection_string() {
        let secret = secret_string("postgresql://u:p@localhost:5432/sync".to_string());
        let parsed: tokio_postgres::Config = secret.expose_secret().parse().unwrap();
        assert_eq!(parsed.get_dbname(), Some("sync"));
    }

    #[test]
    fn test_secret_deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Section {
            api_key: SecretString,
        }

        let section: Section = toml::from_str("api_key = \"k-123\"").unwrap();
        assert_eq!(section.api_key.expose_secret(), "k-123");
        assert!(section.api_key.expose_secret().starts_with("k-"));
    }
}
