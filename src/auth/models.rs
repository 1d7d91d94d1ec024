//! Persisted identity records.

/// A registered user. `id` is assigned by the store and never changes;
/// `password_hash` is the PHC-encoded digest, never the plaintext.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Fields required to create a new identity.
#[derive(Debug)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}
