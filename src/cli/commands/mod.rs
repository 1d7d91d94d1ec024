use clap::{
    Arg, ColorChoice, Command,
    builder::{
        ValueParser,
        styling::{AnsiColor, Effects, Styles},
    },
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("doorman")
        .about("Username/password authentication and session service")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("DOORMAN_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("vault-url")
                .long("vault-url")
                .help("Vault approle login URL, example: https://vault.tld:8200/v1/auth/approle/login")
                .env("DOORMAN_VAULT_URL")
                .required(true),
        )
        .arg(
            Arg::new("vault-role-id")
                .long("vault-role-id")
                .help("Vault role id")
                .env("DOORMAN_VAULT_ROLE_ID")
                .required(true),
        )
        .arg(
            Arg::new("vault-secret-id")
                .long("vault-secret-id")
                .help("Vault secret id")
                .env("DOORMAN_VAULT_SECRET_ID")
                .required_unless_present("vault-wrapped-token"),
        )
        .arg(
            Arg::new("vault-wrapped-token")
                .long("vault-wrapped-token")
                .help("Vault wrapped token")
                .env("DOORMAN_VAULT_WRAPPED_TOKEN"),
        )
        .arg(
            Arg::new("kv-mount")
                .long("kv-mount")
                .help("Vault KV v2 mount holding the application secrets")
                .default_value("secret")
                .env("DOORMAN_KV_MOUNT"),
        )
        .arg(
            Arg::new("kv-path")
                .long("kv-path")
                .help("Path below the KV mount holding the application secrets")
                .default_value("doorman")
                .env("DOORMAN_KV_PATH"),
        )
        .arg(
            Arg::new("session-ttl")
                .long("session-ttl")
                .help("Server-side session lifetime in seconds")
                .default_value("43200")
                .env("DOORMAN_SESSION_TTL")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("cookie-secure")
                .long("cookie-secure")
                .help("Mark the session cookie Secure (HTTPS only)")
                .env("DOORMAN_COOKIE_SECURE")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("DOORMAN_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "doorman");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "Username/password authentication and session service"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_check_port_and_vault_args() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "doorman",
            "--port",
            "8080",
            "--vault-url",
            "https://vault.tld:8200/v1/auth/approle/login",
            "--vault-role-id",
            "role-id",
            "--vault-secret-id",
            "secret-id",
        ]);

        assert_eq!(matches.get_one::<u16>("port").copied(), Some(8080));
        assert_eq!(
            matches.get_one::<String>("vault-url").map(String::as_str),
            Some("https://vault.tld:8200/v1/auth/approle/login")
        );
        assert_eq!(
            matches
                .get_one::<String>("vault-role-id")
                .map(String::as_str),
            Some("role-id")
        );
        assert_eq!(
            matches
                .get_one::<String>("vault-secret-id")
                .map(String::as_str),
            Some("secret-id")
        );
        assert_eq!(
            matches.get_one::<String>("kv-mount").map(String::as_str),
            Some("secret")
        );
        assert_eq!(
            matches.get_one::<String>("kv-path").map(String::as_str),
            Some("doorman")
        );
        assert_eq!(matches.get_one::<u64>("session-ttl").copied(), Some(43200));
        assert!(!matches.get_flag("cookie-secure"));
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                (
                    "DOORMAN_VAULT_URL",
                    Some("https://vault.tld:8200/v1/auth/approle/login"),
                ),
                ("DOORMAN_VAULT_ROLE_ID", Some("role_id")),
                ("DOORMAN_VAULT_SECRET_ID", Some("secret_id")),
                ("DOORMAN_PORT", Some("443")),
                ("DOORMAN_SESSION_TTL", Some("600")),
                ("DOORMAN_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["doorman"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>("vault-url").map(String::as_str),
                    Some("https://vault.tld:8200/v1/auth/approle/login")
                );
                assert_eq!(matches.get_one::<u64>("session-ttl").copied(), Some(600));
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("DOORMAN_LOG_LEVEL", Some(level)),
                    (
                        "DOORMAN_VAULT_URL",
                        Some("http://vault.tld:8200/v1/auth/approle/login"),
                    ),
                    ("DOORMAN_VAULT_ROLE_ID", Some("role_id")),
                    ("DOORMAN_VAULT_SECRET_ID", Some("secret_id")),
                ],
                || {
                    let command = new();
                    let matches = command.get_matches_from(vec!["doorman"]);
                    assert_eq!(
                        matches.get_one::<u8>("verbosity").copied(),
                        Some(index as u8)
                    );
                },
            );
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("DOORMAN_LOG_LEVEL", None::<String>)], || {
                let mut args = vec![
                    "doorman".to_string(),
                    "--vault-url".to_string(),
                    "https://vault.tld:8200/v1/auth/approle/login".to_string(),
                    "--vault-role-id".to_string(),
                    "role_id".to_string(),
                    "--vault-secret-id".to_string(),
                    "secret_id".to_string(),
                ];

                if index > 0 {
                    let v = format!("-{}", "v".repeat(index));
                    args.push(v);
                }

                let command = new();

                let matches = command.get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    Some(index as u8)
                );
            });
        }
    }
}
