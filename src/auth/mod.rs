pub mod models;
pub mod password;
pub mod service;
pub mod store;

pub use self::models::{Identity, NewIdentity};
pub use self::service::{AuthService, LoginOutcome, SignupOutcome};
pub use self::store::{IdentityStore, InsertOutcome, MemoryIdentityStore, PgIdentityStore};
