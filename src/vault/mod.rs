pub mod kv;
pub mod renew;

use crate::cli::globals::GlobalArgs;
use anyhow::{Result, anyhow};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;

/// Rebuild a Vault endpoint URL from the configured login URL, keeping
/// scheme, host, and port but replacing the path.
#[instrument]
pub fn endpoint_url(globals: &GlobalArgs, endpoint: &str) -> Result<String> {
    let url = Url::parse(&globals.vault_url)?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| anyhow!("Error parsing URL: no host specified"))?
        .to_owned();

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => return Err(anyhow!("Error parsing URL: unsupported scheme {}", scheme)),
        },
    };

    let endpoint_url = format!("{scheme}://{host}:{port}{endpoint}");

    debug!("endpoint URL: {}", endpoint);

    Ok(endpoint_url)
}

/// Unwrap a wrapped Vault client token
/// Create wrapped token with:
/// vault write -wrap-ttl=300s -f auth/approle/role/doorman/secret-id
#[instrument(skip(token))]
pub async fn unwrap(globals: &GlobalArgs, token: &str) -> Result<String> {
    let client = Client::builder()
        .user_agent(crate::api::APP_USER_AGENT)
        .build()?;

    let unwrap_url = endpoint_url(globals, "/v1/sys/wrapping/unwrap")?;

    let response = client
        .post(&unwrap_url)
        .header("X-Vault-Token", token)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let json_response: Value = response.json().await?;

        return Err(anyhow!(
            "{} - {}, {}",
            unwrap_url,
            status,
            json_response["errors"][0].as_str().unwrap_or("")
        ));
    }

    let json_response: Value = response.json().await?;
    let sid = json_response["data"]["secret_id"]
        .as_str()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no secret_id found"))?;

    Ok(sid.to_string())
}

/// Login to Vault using AppRole
/// Create a secret ID with:
/// vault write -f auth/approle/role/doorman/secret-id
#[instrument(skip(sid))]
pub async fn approle_login(globals: &GlobalArgs, sid: &str, rid: &str) -> Result<(String, u64)> {
    let client = Client::builder()
        .user_agent(crate::api::APP_USER_AGENT)
        .build()?;

    let login_payload = json!({
        "role_id": rid,
        "secret_id": sid
    });

    debug!("login URL: {}, role ID: {}", globals.vault_url, rid);

    let response = client
        .post(&globals.vault_url)
        .json(&login_payload)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let json_response: Value = response.json().await?;

        return Err(anyhow!(
            "{} - {}, {}",
            globals.vault_url,
            status,
            json_response["errors"][0].as_str().unwrap_or("")
        ));
    }

    let json_response: Value = response.json().await?;
    let token = json_response["auth"]["client_token"]
        .as_str()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no client_token found"))?;
    let lease_duration = json_response["auth"]["lease_duration"]
        .as_u64()
        .unwrap_or(1800);

    Ok((token.to_string(), lease_duration))
}

/// Renew the Vault token used by this process
#[instrument(skip(globals))]
pub async fn renew_self(globals: &GlobalArgs) -> Result<u64> {
    let client = Client::builder()
        .user_agent(crate::api::APP_USER_AGENT)
        .build()?;

    let renew_url = endpoint_url(globals, "/v1/auth/token/renew-self")?;

    let response = client
        .post(&renew_url)
        .header("X-Vault-Token", globals.vault_token.expose_secret())
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let json_response: Value = response.json().await?;

        return Err(anyhow!(
            "{} - {}, {}",
            renew_url,
            status,
            json_response["errors"][0].as_str().unwrap_or("")
        ));
    }

    let json_response: Value = response.json().await?;

    json_response["auth"]["lease_duration"]
        .as_u64()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no lease_duration found"))
}
