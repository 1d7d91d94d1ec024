//! Signup and login orchestration.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

use super::models::{Identity, NewIdentity};
use super::password;
use super::store::{IdentityStore, InsertOutcome};

const USERNAME_MIN_LENGTH: usize = 3;
const USERNAME_MAX_LENGTH: usize = 100;
const PASSWORD_MIN_LENGTH: usize = 8;

/// Outcome of a signup attempt. Infrastructure failures are not
/// represented here; they propagate as errors.
#[derive(Debug)]
pub enum SignupOutcome {
    Created(Identity),
    DuplicateUsername,
    InvalidInput(&'static str),
}

/// Outcome of a login attempt. Unknown username and wrong password are
/// deliberately the same variant so callers cannot enumerate accounts.
#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated(Identity),
    InvalidCredentials,
}

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));

pub fn valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn validate_signup(username: &str, email: &str, plaintext: &str) -> Option<&'static str> {
    if username.len() < USERNAME_MIN_LENGTH || username.len() > USERNAME_MAX_LENGTH {
        return Some("username must be between 3 and 100 characters");
    }
    if !valid_email(email) {
        return Some("invalid email address");
    }
    if plaintext.len() < PASSWORD_MIN_LENGTH {
        return Some("password must be at least 8 characters");
    }
    None
}

/// Orchestrates credential hashing and identity persistence. Stateless
/// per call; concurrency safety comes from the store's uniqueness
/// constraints.
pub struct AuthService {
    store: Arc<dyn IdentityStore>,
}

impl AuthService {
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Register a new identity. No session is created; the caller must
    /// log in separately.
    ///
    /// # Errors
    /// Returns an error if the store fails for reasons other than a
    /// uniqueness conflict.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        plaintext: &str,
    ) -> Result<SignupOutcome> {
        if let Some(reason) = validate_signup(username, email, plaintext) {
            return Ok(SignupOutcome::InvalidInput(reason));
        }

        if self.store.find_by_username(username).await?.is_some() {
            debug!("username already taken");
            return Ok(SignupOutcome::DuplicateUsername);
        }

        let digest = password::hash(plaintext)?;

        // Two concurrent signups can both pass the existence check; the
        // store's uniqueness constraint decides the winner.
        match self
            .store
            .insert(NewIdentity {
                username: username.to_string(),
                email: email.to_string(),
                password_hash: digest,
            })
            .await?
        {
            InsertOutcome::Created(identity) => Ok(SignupOutcome::Created(identity)),
            InsertOutcome::Conflict => Ok(SignupOutcome::DuplicateUsername),
        }
    }

    /// Authenticate a username/password pair.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn login(&self, username: &str, plaintext: &str) -> Result<LoginOutcome> {
        let Some(identity) = self.store.find_by_username(username).await? else {
            debug!("unknown username");
            return Ok(LoginOutcome::InvalidCredentials);
        };

        if !password::verify(plaintext, &identity.password_hash) {
            debug!("password verification failed");
            return Ok(LoginOutcome::InvalidCredentials);
        }

        Ok(LoginOutcome::Authenticated(identity))
    }
}
