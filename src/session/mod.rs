//! Session binding: opaque signed tokens resolved to identities through
//! a shared session store.

pub mod store;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::{RngCore, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{sync::Arc, time::Duration};

use crate::auth::{Identity, IdentityStore};
pub use store::{MemorySessionStore, PgSessionStore, SessionStore};

/// The record kept in the session store; small by design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: i64,
}

/// What a request resolves to once its cookie has been checked.
#[derive(Debug)]
pub enum CurrentUser {
    Identified(Identity),
    Anonymous,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl: Duration,
    pub cookie_secure: bool,
}

/// Create a new session token.
/// The raw value is only handed to the client; the store keys on a hash.
fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a session token so raw values never touch the store.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

fn sign_token(key: &SecretString, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.expose_secret().as_bytes());
    hasher.update(b".");
    hasher.update(token.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Binds session tokens to identities. Tokens are random, signed with
/// the process signing key, and stored hashed with a TTL; resolution is
/// self-healing, anything invalid is simply Anonymous.
pub struct Sessions {
    store: Arc<dyn SessionStore>,
    identities: Arc<dyn IdentityStore>,
    signing_key: SecretString,
    config: SessionConfig,
}

impl Sessions {
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        identities: Arc<dyn IdentityStore>,
        signing_key: SecretString,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            identities,
            signing_key,
            config,
        }
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.config.cookie_secure
    }

    /// Create a new session bound to `identity_id` and return the
    /// signed cookie value (`token.signature`).
    ///
    /// # Errors
    /// Returns an error if the session store fails.
    pub async fn create(&self, identity_id: i64) -> Result<String> {
        let token = generate_session_token()?;
        let token_hash = hash_session_token(&token);

        self.store
            .put(
                &token_hash,
                &SessionData {
                    user_id: identity_id,
                },
                self.config.ttl,
            )
            .await?;

        let signature = sign_token(&self.signing_key, &token);
        Ok(format!("{token}.{signature}"))
    }

    /// Resolve a cookie value to the bound identity.
    ///
    /// A bad signature, a missing or expired session record, or an
    /// identity deleted out-of-band all resolve to Anonymous; none of
    /// them are errors.
    ///
    /// # Errors
    /// Returns an error only if a store lookup fails.
    pub async fn resolve(&self, cookie_value: &str) -> Result<CurrentUser> {
        let Some(token) = self.verify_cookie(cookie_value) else {
            return Ok(CurrentUser::Anonymous);
        };

        let token_hash = hash_session_token(token);
        let Some(data) = self.store.get(&token_hash).await? else {
            return Ok(CurrentUser::Anonymous);
        };

        match self.identities.find_by_id(data.user_id).await? {
            Some(identity) => Ok(CurrentUser::Identified(identity)),
            None => Ok(CurrentUser::Anonymous),
        }
    }

    /// Remove the session record; destroying a token that does not
    /// exist is not an error.
    ///
    /// # Errors
    /// Returns an error if the store delete fails.
    pub async fn destroy(&self, cookie_value: &str) -> Result<()> {
        let Some(token) = self.verify_cookie(cookie_value) else {
            return Ok(());
        };

        let token_hash = hash_session_token(token);
        self.store.delete(&token_hash).await
    }

    /// Check the tamper-evidence signature and return the raw token.
    /// The token alphabet is unpadded base64, so the last `.` always
    /// separates token from signature.
    fn verify_cookie<'a>(&self, cookie_value: &'a str) -> Option<&'a str> {
        let (token, signature) = cookie_value.rsplit_once('.')?;
        if token.is_empty() || signature.is_empty() {
            return None;
        }

        let expected = sign_token(&self.signing_key, token);
        if expected == signature {
            Some(token)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signing_key() -> SecretString {
        SecretString::from("test-signing-key".to_string())
    }

    #[test]
    fn generated_tokens_are_unique_and_opaque() {
        let first = generate_session_token().unwrap();
        let second = generate_session_token().unwrap();
        assert_ne!(first, second);
        assert_eq!(URL_SAFE_NO_PAD.decode(first.as_bytes()).unwrap().len(), 32);
    }

    #[test]
    fn hash_session_token_stable() {
        let first = hash_session_token("token");
        let second = hash_session_token("token");
        let different = hash_session_token("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
    }

    #[test]
    fn sign_token_depends_on_key_and_token() {
        let key = signing_key();
        let other_key = SecretString::from("other-key".to_string());
        assert_eq!(sign_token(&key, "token"), sign_token(&key, "token"));
        assert_ne!(sign_token(&key, "token"), sign_token(&key, "other"));
        assert_ne!(sign_token(&key, "token"), sign_token(&other_key, "token"));
    }
}
