//! commitcensus command-line tool.
//!
//! Collects commit activity from GitHub, GitLab and Azure DevOps into a
//! local database and reports the contributors counted in the rolling
//! window, per platform and overall.

mod commands;
mod style;
mod table_sink;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use commitcensus_core::config::AppConfig;
use commitcensus_core::db::Database;
use commitcensus_core::models::Platform;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// commitcensus command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "commitcensus",
    version,
    about = "Count the contributors committing to GitHub, GitLab and Azure DevOps"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "./commitcensus.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Log level or filter directive; overrides -v and the config file.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./commitcensus.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,

    /// Fetch commits in the window from the platform APIs.
    Collect {
        /// Only this platform (github, gitlab, azuredevops).
        #[arg(short, long)]
        platform: Option<Platform>,

        /// Re-fetch repositories fetched earlier, replacing their commits.
        #[arg(long)]
        refresh: bool,
    },

    /// Count contributors from the collected commits.
    Report {
        /// Only this platform (github, gitlab, azuredevops).
        #[arg(short, long)]
        platform: Option<Platform>,

        /// Directory for JSON reports (default: census.report_dir).
        #[arg(long)]
        json_dir: Option<PathBuf>,

        /// Also print each repository's contributors.
        #[arg(long)]
        repositories: bool,

        /// Also print excluded contributors.
        #[arg(long)]
        excluded: bool,
    },

    /// Collect, then report, for every enabled platform.
    Run {
        /// Re-fetch repositories fetched earlier, replacing their commits.
        #[arg(long)]
        refresh: bool,
    },

    /// Show how a platform's exclusion rules classify an email address.
    Classify {
        /// Email address to classify.
        email: String,

        /// Platform whose rules apply.
        #[arg(short, long)]
        platform: Platform,
    },

    /// Import a JSON array of raw commit payloads for one repository.
    Import {
        /// Platform the payloads come from.
        platform: Platform,

        /// Repository path, e.g. `acme/api`.
        repo: String,

        /// JSON file holding the payloads.
        file: PathBuf,

        /// Replace the repository's stored commits instead of adding to them.
        #[arg(long)]
        replace: bool,
    },

    /// Show collected repositories and the last census run.
    Status,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let mut cli = Cli::parse();
    cli.config = resolve_config_path(cli.config, dirs::config_dir());

    let configured = configured_log_level(&cli.config);
    let filter = log_filter(cli.log_level.as_deref(), cli.verbose, configured.as_deref());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .without_time()
        .init();
    debug!(config = %cli.config.display(), filter = %filter, "starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("Error: {:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => commands::init::run_init(&output),
        Commands::Validate => commands::validate::run_validate(&cli.config),
        Commands::Classify { email, platform } => {
            let config = load_config(&cli.config)?;
            commands::classify::run_classify(&config, &email, platform)
        }
        command => {
            // Everything else works on the commit database.
            let config = load_config(&cli.config)?;
            let db = open_database(&config)?;

            match command {
                Commands::Collect { platform, refresh } => {
                    let platforms = commands::platforms_to_process(&config, platform)?;
                    commands::collect::run_collect(&db, &config, &platforms, refresh).await
                }
                Commands::Report {
                    platform,
                    json_dir,
                    repositories,
                    excluded,
                } => {
                    let platforms = commands::platforms_to_process(&config, platform)?;
                    let options = commands::report::ReportOptions {
                        json_dir,
                        show_repositories: repositories,
                        show_excluded: excluded,
                    };
                    commands::report::run_report(&db, &config, &platforms, &options)
                }
                Commands::Run { refresh } => {
                    let platforms = commands::platforms_to_process(&config, None)?;
                    commands::collect::run_collect(&db, &config, &platforms, refresh).await?;
                    commands::report::run_report(
                        &db,
                        &config,
                        &platforms,
                        &commands::report::ReportOptions::default(),
                    )
                }
                Commands::Import {
                    platform,
                    repo,
                    file,
                    replace,
                } => commands::import::run_import(&db, &config, platform, &repo, &file, replace),
                Commands::Status => commands::status::run_status(&db, &config),
                Commands::Init { .. } | Commands::Validate | Commands::Classify { .. } => {
                    unreachable!("handled before opening the database")
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Filter directive from, in priority order: `--log-level`, `-v` count, the
/// config file's `census.log_level`, then `warn`.
fn log_filter(cli_level: Option<&str>, verbose: u8, configured: Option<&str>) -> String {
    if let Some(level) = cli_level.filter(|l| !l.trim().is_empty()) {
        return level.trim().to_string();
    }
    match verbose {
        0 => configured
            .filter(|l| !l.trim().is_empty())
            .map_or_else(|| "warn".to_string(), |l| l.trim().to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// The config file's log level, if the file can be read at all. Errors are
/// reported later by the command that needs the config.
fn configured_log_level(path: &Path) -> Option<String> {
    AppConfig::load_from_file(path)
        .ok()
        .map(|config| config.census.log_level)
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG_PATH: &str = "./commitcensus.toml";

/// Fall back to `<config dir>/commitcensus/commitcensus.toml` when the
/// default path was left in place and has no file.
fn resolve_config_path(path: PathBuf, config_dir: Option<PathBuf>) -> PathBuf {
    if path != Path::new(DEFAULT_CONFIG_PATH) || path.exists() {
        return path;
    }
    config_dir
        .map(|dir| dir.join("commitcensus").join("commitcensus.toml"))
        .filter(|candidate| candidate.exists())
        .unwrap_or(path)
}

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load_and_resolve(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

fn open_database(config: &AppConfig) -> Result<Database> {
    let db_path = config.database_path();
    Database::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_filter_priority() {
        assert_eq!(log_filter(Some("info"), 2, Some("error")), "info");
        assert_eq!(log_filter(None, 1, Some("error")), "debug");
        assert_eq!(log_filter(None, 3, None), "trace");
        assert_eq!(log_filter(None, 0, Some("error")), "error");
        assert_eq!(log_filter(None, 0, None), "warn");
        assert_eq!(log_filter(Some(" "), 0, Some("")), "warn");
    }

    #[test]
    fn test_resolve_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let user_config = dir.path().join("commitcensus").join("commitcensus.toml");

        // Nothing in the user config dir: keep the default.
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        assert_eq!(
            resolve_config_path(default.clone(), Some(dir.path().to_path_buf())),
            default
        );

        std::fs::create_dir_all(user_config.parent().unwrap()).unwrap();
        std::fs::write(&user_config, "").unwrap();
        if !default.exists() {
            assert_eq!(
                resolve_config_path(default.clone(), Some(dir.path().to_path_buf())),
                user_config
            );
        }

        // An explicit path is never replaced.
        let explicit = PathBuf::from("/nonexistent/census.toml");
        assert_eq!(
            resolve_config_path(explicit.clone(), Some(dir.path().to_path_buf())),
            explicit
        );
    }

    #[test]
    fn test_parse_platform_arguments() {
        let cli = Cli::try_parse_from([
            "commitcensus",
            "-vv",
            "collect",
            "--platform",
            "azure-devops",
            "--refresh",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Collect { platform, refresh } => {
                assert_eq!(platform, Some(Platform::AzureDevOps));
                assert!(refresh);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let result = Cli::try_parse_from(["commitcensus", "classify", "a@b.c", "-p", "bitbucket"]);
        assert!(result.is_err());
    }
}
