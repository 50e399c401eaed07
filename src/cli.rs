use clap::{Args, Parser, Subcommand};
use pillminder::config::{AppConfig, StoreConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use time::UtcOffset;
use time::macros::format_description;

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve(SocketAddr, AppConfig),
    Exit(i32),
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("--database-url cannot be empty")]
    EmptyDatabaseUrl,
    #[error("--memory-store and --database-url are mutually exclusive")]
    ConflictingStores,
    #[error("invalid UTC offset '{0}'; expected +HH:MM or -HH:MM")]
    UtcOffset(String),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::Init(args)) = cli.command {
        let code = run_init(args);
        return RunOutcome::Exit(code);
    }

    let store = match resolve_store_config(&cli) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };
    let utc_offset = match parse_utc_offset(&cli.utc_offset) {
        Ok(offset) => offset,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    RunOutcome::Serve(
        cli.bind,
        AppConfig {
            app_name: cli.app_name,
            store,
            utc_offset,
            subscriptions: cli.subscriptions,
            vapid_private_key: cli.vapid_private_key,
            vapid_public_key: cli.vapid_public_key,
            vapid_subject: cli.vapid_subject,
        },
    )
}

#[derive(Parser, Debug)]
#[command(
    name = "pillminder",
    version,
    about = "Medication schedule and adherence dashboard"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, env = "PILLMINDER_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,
    #[arg(long, env = "PILLMINDER_APP_NAME", default_value = "Pillminder")]
    app_name: String,
    /// Realtime database root, e.g. https://<project>.firebaseio.com
    #[arg(long, env = "PILLMINDER_DATABASE_URL")]
    database_url: Option<String>,
    #[arg(long, env = "PILLMINDER_DATABASE_SECRET")]
    database_secret: Option<String>,
    /// Keep data in memory instead of a realtime database.
    #[arg(long, env = "PILLMINDER_MEMORY_STORE")]
    memory_store: bool,
    #[arg(long, env = "PILLMINDER_UTC_OFFSET", default_value = "+00:00")]
    utc_offset: String,
    #[arg(long, env = "PILLMINDER_SUBSCRIPTIONS")]
    subscriptions: Option<PathBuf>,
    #[arg(long, env = "PILLMINDER_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "PILLMINDER_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "PILLMINDER_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate VAPID credentials for dose reminders.
    Init(InitArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = match pillminder::reminders::generate_vapid_credentials() {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("failed to generate VAPID credentials: {err}");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    for line in credentials.env_lines(&subject) {
        println!("{line}");
    }
    if show_subject_note {
        println!();
        println!("Note: replace PILLMINDER_VAPID_SUBJECT with a contact URI you control.");
    }
    println!();
    println!(
        "--vapid-private-key \"{}\" --vapid-public-key \"{}\" --vapid-subject \"{subject}\"",
        credentials.private_key, credentials.public_key
    );
    0
}

fn resolve_store_config(cli: &Cli) -> Result<StoreConfig, ConfigError> {
    match (cli.database_url.as_deref().map(str::trim), cli.memory_store) {
        (Some(_), true) => Err(ConfigError::ConflictingStores),
        (Some(""), false) => Err(ConfigError::EmptyDatabaseUrl),
        (Some(url), false) => Ok(StoreConfig::Firebase {
            database_url: url.to_string(),
            secret: cli
                .database_secret
                .as_deref()
                .map(str::trim)
                .filter(|secret| !secret.is_empty())
                .map(str::to_string),
        }),
        (None, true) => Ok(StoreConfig::Memory),
        (None, false) => Ok(StoreConfig::Unconfigured),
    }
}

fn parse_utc_offset(raw: &str) -> Result<UtcOffset, ConfigError> {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(
        value,
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|_| ConfigError::UtcOffset(raw.to_string()))
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use time::macros::offset;

    fn base_cli() -> Cli {
        Cli {
            command: None,
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            app_name: "Pillminder".to_string(),
            database_url: None,
            database_secret: None,
            memory_store: false,
            utc_offset: "+00:00".to_string(),
            subscriptions: None,
            vapid_private_key: None,
            vapid_public_key: None,
            vapid_subject: None,
        }
    }

    #[test]
    fn parse_utc_offset__should_parse_signed_offsets() {
        // Then
        assert_eq!(parse_utc_offset("+02:00"), Ok(offset!(+02:00)));
        assert_eq!(parse_utc_offset("-05:30"), Ok(offset!(-05:30)));
        assert_eq!(parse_utc_offset("UTC"), Ok(UtcOffset::UTC));
    }

    #[test]
    fn parse_utc_offset__should_reject_invalid_values() {
        // Then
        assert!(parse_utc_offset("").is_err());
        assert!(parse_utc_offset("02:00").is_err());
        assert!(parse_utc_offset("+2").is_err());
        assert!(parse_utc_offset("Europe/Stockholm").is_err());
    }

    #[test]
    fn resolve_store_config__should_be_unconfigured_without_url() {
        // Then
        assert_eq!(resolve_store_config(&base_cli()), Ok(StoreConfig::Unconfigured));
    }

    #[test]
    fn resolve_store_config__should_build_firebase_config() {
        // Given
        let mut cli = base_cli();
        cli.database_url = Some(" https://demo.firebaseio.com ".to_string());
        cli.database_secret = Some(String::new());

        // When
        let store = resolve_store_config(&cli).expect("store config");

        // Then
        assert_eq!(
            store,
            StoreConfig::Firebase {
                database_url: "https://demo.firebaseio.com".to_string(),
                secret: None,
            }
        );
    }

    #[test]
    fn resolve_store_config__should_reject_empty_or_conflicting_options() {
        // Given
        let mut cli = base_cli();
        cli.database_url = Some("  ".to_string());

        // Then
        assert_eq!(resolve_store_config(&cli), Err(ConfigError::EmptyDatabaseUrl));
        cli.memory_store = true;
        assert_eq!(resolve_store_config(&cli), Err(ConfigError::ConflictingStores));
        cli.database_url = None;
        assert_eq!(resolve_store_config(&cli), Ok(StoreConfig::Memory));
    }
}
