use crate::{cli::globals::GlobalArgs, vault};
use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{Instrument, info_span, instrument};

const SECRET_KEY_FIELD: &str = "secret_key";
const DATABASE_URL_FIELD: &str = "database_url";
const SESSION_STORE_URL_FIELD: &str = "session_store_url";

/// The three secrets the service needs before it may serve.
pub struct AppSecrets {
    pub secret_key: SecretString,
    pub database_url: SecretString,
    pub session_store_url: SecretString,
}

/// Read the application secrets from a Vault KV v2 mount.
///
/// All three fields are required; a missing field is a startup failure,
/// the process must not serve with partial secrets.
///
/// # Errors
/// Returns an error if the Vault request fails or any secret is missing.
#[instrument(skip(globals))]
pub async fn read_app_secrets(
    globals: &GlobalArgs,
    kv_mount: &str,
    kv_path: &str,
) -> Result<AppSecrets> {
    let client = Client::builder()
        .user_agent(crate::api::APP_USER_AGENT)
        .build()?;
    let path = format!("/v1/{kv_mount}/data/{kv_path}");
    let url = vault::endpoint_url(globals, &path)?;

    let span = info_span!(
        "vault.kv.read",
        http.method = "GET",
        url = %url
    );
    let response = client
        .get(&url)
        .header("X-Vault-Token", globals.vault_token.expose_secret())
        .send()
        .instrument(span)
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("vault kv read failed: {status} {body}"));
    }

    let json: Value = response.json().await?;
    let data = json
        .get("data")
        .and_then(|data| data.get("data"))
        .context("no data in vault kv response")?;

    Ok(AppSecrets {
        secret_key: required_field(data, SECRET_KEY_FIELD)?,
        database_url: required_field(data, DATABASE_URL_FIELD)?,
        session_store_url: required_field(data, SESSION_STORE_URL_FIELD)?,
    })
}

fn required_field(data: &Value, field: &str) -> Result<SecretString> {
    let value = data
        .get(field)
        .and_then(Value::as_str)
        .with_context(|| format!("secret field {field} missing from vault response"))?;
    if value.is_empty() {
        return Err(anyhow!("secret field {field} is empty"));
    }
    Ok(SecretString::from(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_field_present() {
        let data = json!({"secret_key": "s3cret"});
        let value = required_field(&data, "secret_key").unwrap();
        assert_eq!(value.expose_secret(), "s3cret");
    }

    #[test]
    fn required_field_missing_or_empty() {
        let data = json!({"secret_key": ""});
        assert!(required_field(&data, "secret_key").is_err());
        assert!(required_field(&data, "database_url").is_err());
    }

    #[test]
    fn required_field_rejects_non_string() {
        let data = json!({"secret_key": 42});
        assert!(required_field(&data, "secret_key").is_err());
    }
}
