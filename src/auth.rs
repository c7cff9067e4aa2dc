//! Authentication gate
//!
//! Every resource endpoint accepts either an `X-F5-Auth-Token` issued by the
//! login endpoint or HTTP basic credentials. Tokens live in memory for a
//! fixed lifetime and are evicted lazily, the first time a lookup observes
//! them past expiry.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Credentials;
use crate::error::{ResourceKind, SimError};

/// Token lifetime reported to clients
pub const TOKEN_TIMEOUT_SECS: i64 = 1200;

/// Token lifetime in the microsecond units used for timestamps
pub const TOKEN_TIMEOUT_MICROS: i64 = TOKEN_TIMEOUT_SECS * 1_000_000;

/// Login provider assumed when the client names none
pub const DEFAULT_LOGIN_PROVIDER: &str = "tmos";

const TOKEN_LEN: usize = 26;

/// Source of "now" in microseconds since the Unix epoch
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp_micros())
}

/// An issued bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token: String,
    pub username: String,
    pub login_provider: String,
    pub created_micros: i64,
    pub expiration_micros: i64,
}

impl Token {
    pub fn is_expired(&self, now_micros: i64) -> bool {
        now_micros > self.expiration_micros
    }
}

/// Credentials presented by one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presented<'a> {
    Token(&'a str),
    Basic { username: &'a str, password: &'a str },
    Anonymous,
}

/// Validates credentials and owns the token table
pub struct AuthGate {
    credentials: Credentials,
    tokens: DashMap<String, Token>,
    clock: Clock,
}

impl AuthGate {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_clock(credentials, system_clock())
    }

    /// Create with a custom time source
    pub fn with_clock(credentials: Credentials, clock: Clock) -> Self {
        Self {
            credentials,
            tokens: DashMap::new(),
            clock,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }

    /// Compare against the configured pair without short-circuiting on the
    /// first mismatching field.
    pub fn check_credentials(&self, username: &str, password: &str) -> bool {
        let user_ok = username
            .as_bytes()
            .ct_eq(self.credentials.username.as_bytes());
        let pass_ok = password
            .as_bytes()
            .ct_eq(self.credentials.password.as_bytes());
        bool::from(user_ok & pass_ok)
    }

    /// Issue a token for a valid username/password pair
    pub fn login(
        &self,
        username: &str,
        password: &str,
        login_provider: Option<&str>,
    ) -> Result<Token, SimError> {
        if !self.check_credentials(username, password) {
            warn!("Login failed for user: {}", username);
            return Err(SimError::AuthenticationFailed);
        }

        let created = self.now();
        let token = Token {
            token: generate_token_value(),
            username: username.to_string(),
            login_provider: login_provider
                .unwrap_or(DEFAULT_LOGIN_PROVIDER)
                .to_string(),
            created_micros: created,
            expiration_micros: created + TOKEN_TIMEOUT_MICROS,
        };

        self.tokens.insert(token.token.clone(), token.clone());
        info!("Login successful for user: {}", username);
        Ok(token)
    }

    /// Authenticate a request, returning the owning username.
    ///
    /// A presented token is authoritative: an unknown or expired token fails
    /// even if basic credentials would have been valid.
    pub fn authenticate(&self, presented: Presented<'_>) -> Result<String, SimError> {
        match presented {
            Presented::Token(value) => {
                let username = self.take_live_token(value)?;
                debug!("Token authenticated: {}", username);
                Ok(username)
            }
            Presented::Basic { username, password } => {
                if self.check_credentials(username, password) {
                    debug!("User authenticated: {}", username);
                    Ok(username.to_string())
                } else {
                    warn!("Authentication failed for user: {}", username);
                    Err(SimError::InvalidCredentials)
                }
            }
            Presented::Anonymous => {
                warn!("Request carried no credentials");
                Err(SimError::InvalidCredentials)
            }
        }
    }

    /// Look up a token for the token-info endpoint. Expired tokens are evicted
    /// and reported as not found.
    pub fn token_info(&self, value: &str) -> Result<Token, SimError> {
        let now = self.now();
        match self.tokens.entry(value.to_string()) {
            Entry::Occupied(entry) if entry.get().is_expired(now) => {
                warn!("Token expired: {}", value);
                entry.remove();
                Err(SimError::NotFound(ResourceKind::Token))
            }
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(_) => Err(SimError::NotFound(ResourceKind::Token)),
        }
    }

    /// Check and evict under the same shard lock so a concurrent reader sees
    /// either the live token or nothing.
    fn take_live_token(&self, value: &str) -> Result<String, SimError> {
        let now = self.now();
        match self.tokens.entry(value.to_string()) {
            Entry::Occupied(entry) if entry.get().is_expired(now) => {
                warn!("Token expired: {}", value);
                entry.remove();
                Err(SimError::TokenExpired)
            }
            Entry::Occupied(entry) => Ok(entry.get().username.clone()),
            Entry::Vacant(_) => {
                warn!("Invalid token: {}", value);
                Err(SimError::InvalidToken)
            }
        }
    }

    /// Number of tokens currently held, expired or not
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

/// 26 upper-case hex characters, e.g. `9F1C0A7E3B5D4C2A8E6F0B1D3C`
fn generate_token_value() -> String {
    let mut value = Uuid::new_v4().simple().to_string().to_uppercase();
    value.truncate(TOKEN_LEN);
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    const START: i64 = 1_700_000_000_000_000;

    fn manual_gate() -> (AuthGate, Arc<AtomicI64>) {
        let now = Arc::new(AtomicI64::new(START));
        let handle = now.clone();
        let gate = AuthGate::with_clock(
            Credentials::new("admin", "f5password"),
            Arc::new(move || handle.load(Ordering::SeqCst)),
        );
        (gate, now)
    }

    #[test]
    fn test_login_issues_token_with_fixed_lifetime() {
        let (gate, _) = manual_gate();
        let token = gate.login("admin", "f5password", None).unwrap();

        assert_eq!(token.token.len(), 26);
        assert!(token
            .token
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_eq!(token.created_micros, START);
        assert_eq!(token.expiration_micros - token.created_micros, 1_200_000_000);
        assert_eq!(token.login_provider, "tmos");
        assert_eq!(gate.token_count(), 1);
    }

    #[test]
    fn test_login_rejects_bad_credentials() {
        let (gate, _) = manual_gate();

        let result = gate.login("admin", "wrong", Some("tmos"));
        assert!(matches!(result, Err(SimError::AuthenticationFailed)));
        let result = gate.login("root", "f5password", None);
        assert!(matches!(result, Err(SimError::AuthenticationFailed)));
        assert_eq!(gate.token_count(), 0);
    }

    #[test]
    fn test_tokens_are_distinct() {
        let (gate, _) = manual_gate();
        let a = gate.login("admin", "f5password", None).unwrap();
        let b = gate.login("admin", "f5password", None).unwrap();
        assert_ne!(a.token, b.token);
        assert_eq!(gate.token_count(), 2);
    }

    #[test]
    fn test_authenticate_with_token() {
        let (gate, now) = manual_gate();
        let token = gate.login("admin", "f5password", None).unwrap();

        now.store(token.expiration_micros, Ordering::SeqCst);
        assert_eq!(
            gate.authenticate(Presented::Token(&token.token)).unwrap(),
            "admin"
        );
    }

    #[test]
    fn test_expired_token_is_evicted() {
        let (gate, now) = manual_gate();
        let token = gate.login("admin", "f5password", None).unwrap();

        now.store(token.expiration_micros + 1, Ordering::SeqCst);
        assert!(matches!(
            gate.authenticate(Presented::Token(&token.token)),
            Err(SimError::TokenExpired)
        ));
        assert_eq!(gate.token_count(), 0);

        // Second use finds nothing
        assert!(matches!(
            gate.authenticate(Presented::Token(&token.token)),
            Err(SimError::InvalidToken)
        ));
        assert!(matches!(
            gate.token_info(&token.token),
            Err(SimError::NotFound(ResourceKind::Token))
        ));
    }

    #[test]
    fn test_unknown_token() {
        let (gate, _) = manual_gate();
        assert!(matches!(
            gate.authenticate(Presented::Token("NOPE")),
            Err(SimError::InvalidToken)
        ));
    }

    #[test]
    fn test_basic_fallback() {
        let (gate, _) = manual_gate();
        assert_eq!(
            gate.authenticate(Presented::Basic {
                username: "admin",
                password: "f5password"
            })
            .unwrap(),
            "admin"
        );
        assert!(matches!(
            gate.authenticate(Presented::Basic {
                username: "admin",
                password: "f5passwor"
            }),
            Err(SimError::InvalidCredentials)
        ));
        assert!(matches!(
            gate.authenticate(Presented::Anonymous),
            Err(SimError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_token_info_expiry() {
        let (gate, now) = manual_gate();
        let token = gate.login("admin", "f5password", Some("local")).unwrap();

        let info = gate.token_info(&token.token).unwrap();
        assert_eq!(info, token);
        assert_eq!(info.login_provider, "local");

        now.store(token.expiration_micros + 1, Ordering::SeqCst);
        assert!(matches!(
            gate.token_info(&token.token),
            Err(SimError::NotFound(ResourceKind::Token))
        ));
        assert_eq!(gate.token_count(), 0);
    }
}
