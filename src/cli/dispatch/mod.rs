//! Map validated CLI arguments to the action to execute.

use crate::cli::actions::{Action, server::Args};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let vault_url = matches
        .get_one::<String>("vault-url")
        .cloned()
        .context("missing required argument: --vault-url")?;

    let vault_role_id = matches
        .get_one::<String>("vault-role-id")
        .cloned()
        .context("missing required argument: --vault-role-id")?;

    let vault_secret_id = matches.get_one::<String>("vault-secret-id").cloned();
    let vault_wrapped_token = matches.get_one::<String>("vault-wrapped-token").cloned();

    let kv_mount = matches
        .get_one::<String>("kv-mount")
        .cloned()
        .unwrap_or_else(|| "secret".to_string());
    let kv_path = matches
        .get_one::<String>("kv-path")
        .cloned()
        .unwrap_or_else(|| "doorman".to_string());

    let session_ttl_seconds = matches
        .get_one::<u64>("session-ttl")
        .copied()
        .unwrap_or(43200);

    Ok(Action::Server(Args {
        port,
        vault_url,
        vault_role_id,
        vault_secret_id,
        vault_wrapped_token,
        kv_mount,
        kv_path,
        session_ttl_seconds,
        cookie_secure: matches.get_flag("cookie-secure"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn handler_builds_server_action() {
        let matches = commands::new().get_matches_from(vec![
            "doorman",
            "--port",
            "9999",
            "--vault-url",
            "https://vault.tld:8200/v1/auth/approle/login",
            "--vault-role-id",
            "role-id",
            "--vault-secret-id",
            "secret-id",
            "--session-ttl",
            "120",
            "--cookie-secure",
        ]);

        let Ok(Action::Server(args)) = handler(&matches) else {
            panic!("expected server action");
        };

        assert_eq!(args.port, 9999);
        assert_eq!(args.vault_url, "https://vault.tld:8200/v1/auth/approle/login");
        assert_eq!(args.vault_role_id, "role-id");
        assert_eq!(args.vault_secret_id.as_deref(), Some("secret-id"));
        assert_eq!(args.vault_wrapped_token, None);
        assert_eq!(args.kv_mount, "secret");
        assert_eq!(args.kv_path, "doorman");
        assert_eq!(args.session_ttl_seconds, 120);
        assert!(args.cookie_secure);
    }
}
