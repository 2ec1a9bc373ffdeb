//! Secure token manager for publisher credentials
//!
//! Tokens are held as `SecretString` so they never show up in `Debug`
//! output, and every string that may echo a token is masked before logging.

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

/// Publisher kinds with their credential environment variables
const PUBLISHER_TOKENS: &[(&str, &str)] = &[("webhook", "CAMPAIGN_WEBHOOK_TOKEN")];

/// Credential store for publisher backends
///
/// # Examples
///
/// ```
/// use campaign_publisher::security::SecureTokenManager;
/// use std::collections::HashMap;
///
/// let mut env = HashMap::new();
/// env.insert("CAMPAIGN_WEBHOOK_TOKEN".to_string(), "tok_abcdef123456".to_string());
///
/// let manager = SecureTokenManager::from_env(&env);
/// assert!(manager.has_token("webhook"));
/// assert_eq!(manager.mask_tokens_in_string("sent tok_abcdef123456"), "sent tok...456");
/// ```
#[derive(Default)]
pub struct SecureTokenManager {
    tokens: HashMap<String, SecretString>,
}

impl SecureTokenManager {
    /// Create a manager with no credentials
    pub fn new() -> Self {
        Self::default()
    }

    /// Read credentials from an environment snapshot
    pub fn from_env(vars: &HashMap<String, String>) -> Self {
        let tokens = PUBLISHER_TOKENS
            .iter()
            .filter_map(|(kind, var)| {
                vars.get(*var)
                    .filter(|value| !value.is_empty())
                    .map(|value| (kind.to_string(), SecretString::new(value.as_str().into())))
            })
            .collect();

        Self { tokens }
    }

    /// Retrieves the token for a publisher kind
    ///
    /// Returns `None` if the kind is unknown or no token is set.
    pub fn get_token(&self, publisher: &str) -> Option<SecretString> {
        self.tokens
            .get(publisher)
            .map(|token| SecretString::new(token.expose_secret().into()))
    }

    pub fn has_token(&self, publisher: &str) -> bool {
        self.tokens.contains_key(publisher)
    }

    /// Masks a token for safe logging
    ///
    /// Shows only the first 3 and last 3 characters for identification purposes.
    /// Tokens shorter than 10 characters are fully masked as "****".
    ///
    /// # Examples
    ///
    /// ```
    /// use campaign_publisher::security::SecureTokenManager;
    ///
    /// assert_eq!(SecureTokenManager::mask_token("abcdef123456"), "abc...456");
    /// assert_eq!(SecureTokenManager::mask_token("short"), "****");
    /// ```
    pub fn mask_token(token: &str) -> String {
        if token.chars().count() < 10 {
            return "****".to_string();
        }

        let prefix: String = token.chars().take(3).collect();
        let suffix: String = token
            .chars()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{}...{}", prefix, suffix)
    }

    /// Masks all known tokens in a string
    pub fn mask_tokens_in_string(&self, text: &str) -> String {
        self.tokens.values().fold(text.to_string(), |masked, token| {
            let secret = token.expose_secret();
            masked.replace(secret, &Self::mask_token(secret))
        })
    }

    /// Gets the environment variable name for a publisher kind
    pub fn get_token_name(&self, publisher: &str) -> Option<&'static str> {
        PUBLISHER_TOKENS
            .iter()
            .find(|(kind, _)| *kind == publisher)
            .map(|(_, var)| *var)
    }
}
