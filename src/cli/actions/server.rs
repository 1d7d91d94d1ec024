use crate::{api, cli::globals::GlobalArgs, session::SessionConfig, vault};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;
use tracing::info;

/// Arguments for the server action, assembled by the dispatcher.
#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub vault_url: String,
    pub vault_role_id: String,
    pub vault_secret_id: Option<String>,
    pub vault_wrapped_token: Option<String>,
    pub kv_mount: String,
    pub kv_path: String,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
}

/// Handle the server action: authenticate against Vault, load the
/// application secrets, and start serving.
///
/// Startup is all-or-nothing: any failure before the listener is bound
/// aborts the process so it never serves with partial secrets.
///
/// # Errors
/// Returns an error if Vault login, secret retrieval, or the server fails.
pub async fn handle(args: Args) -> Result<()> {
    let mut globals = GlobalArgs::new(args.vault_url.clone());

    // A wrapped token takes the place of a plain secret id
    let secret_id = match (&args.vault_wrapped_token, &args.vault_secret_id) {
        (Some(wrapped), _) => vault::unwrap(&globals, wrapped)
            .await
            .context("Failed to unwrap Vault secret id")?,
        (None, Some(sid)) => sid.clone(),
        (None, None) => anyhow::bail!("missing Vault secret id or wrapped token"),
    };

    let (token, lease_duration) = vault::approle_login(&globals, &secret_id, &args.vault_role_id)
        .await
        .context("Vault approle login failed")?;

    globals.set_token(SecretString::from(token));

    let secrets = vault::kv::read_app_secrets(&globals, &args.kv_mount, &args.kv_path)
        .await
        .context("Failed to load application secrets from Vault")?;

    info!("Secrets loaded, starting server on port {}", args.port);

    let config = SessionConfig {
        ttl: Duration::from_secs(args.session_ttl_seconds),
        cookie_secure: args.cookie_secure,
    };

    api::new(args.port, secrets, &globals, lease_duration, config).await?;

    Ok(())
}
