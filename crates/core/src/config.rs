//! TOML-based configuration system for commitcensus.
//!
//! API tokens are never stored in the file: each platform section names the
//! environment variable holding its token (`token_env`), resolved at runtime
//! via [`AppConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;
use crate::models::Platform;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Window, storage and reporting settings.
    #[serde(default)]
    pub census: CensusConfig,

    /// Shared HTTP client behaviour for all platform APIs.
    #[serde(default)]
    pub http: HttpConfig,

    /// GitHub settings.
    #[serde(default)]
    pub github: PlatformConfig,

    /// GitLab settings.
    #[serde(default)]
    pub gitlab: PlatformConfig,

    /// Azure DevOps settings.
    #[serde(default)]
    pub azure_devops: PlatformConfig,
}

// ---------------------------------------------------------------------------
// Census
// ---------------------------------------------------------------------------

/// Rolling window, storage and report locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CensusConfig {
    /// Length of the rolling window in days (default 90).
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Directory holding the commit database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory JSON reports are written to.
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Upper bound on `census.window_days` (100 years).
pub const MAX_WINDOW_DAYS: u32 = 36_500;

fn default_window_days() -> u32 {
    90
}
fn default_data_dir() -> PathBuf {
    PathBuf::from(".commitcensus")
}
fn default_report_dir() -> PathBuf {
    PathBuf::from("census-report")
}
fn default_log_level() -> String {
    "warn".into()
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            data_dir: default_data_dir(),
            report_dir: default_report_dir(),
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Retry, paging and timeout settings for platform API calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Retries after a rate-limited or failed request (default 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay before the first retry; doubled on each attempt.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Per-request timeout in seconds (default 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Items requested per page, 1-100 (default 100).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    1000
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_page_size() -> u32 {
    100
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

// ---------------------------------------------------------------------------
// Platforms
// ---------------------------------------------------------------------------

/// Settings for one source-control platform.
///
/// A platform whose section is absent is disabled. A present section is
/// enabled unless it says `enabled = false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// REST API base URL. Defaults to the public service.
    #[serde(default)]
    pub api_url: Option<String>,

    /// Environment variable holding the API token.
    #[serde(default)]
    pub token_env: Option<String>,

    /// Organization (GitHub, Azure DevOps) or group (GitLab) whose
    /// repositories are listed. Without it, GitHub and GitLab list the
    /// repositories the token's user belongs to.
    #[serde(default)]
    pub owner: Option<String>,

    /// Glob patterns selecting repositories by path (empty = all).
    #[serde(default)]
    pub repositories: Vec<String>,

    /// A single exclusion pattern, optionally in `/pattern/flags` form.
    #[serde(default)]
    pub exclude_pattern: Option<String>,

    /// File of newline-separated exclusion patterns. Relative paths are
    /// resolved against the config file's directory. Blank lines and lines
    /// starting with `#` are skipped; write a pattern that begins with `#`
    /// in `/.../` form, e.g. `/#ci@/`.
    #[serde(default)]
    pub exclude_file: Option<PathBuf>,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: None,
            token_env: None,
            owner: None,
            repositories: Vec::new(),
            exclude_pattern: None,
            exclude_file: None,
            token: None,
        }
    }
}

/// Environment variable consulted when `token_env` is not set.
pub fn default_token_env(platform: Platform) -> &'static str {
    match platform {
        Platform::GitHub => "GITHUB_TOKEN",
        Platform::GitLab => "GITLAB_TOKEN",
        Platform::AzureDevOps => "AZURE_DEVOPS_TOKEN",
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let mut config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(base) = path.parent() {
            config.resolve_relative_paths(base);
        }

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Settings for `platform`.
    pub fn platform(&self, platform: Platform) -> &PlatformConfig {
        match platform {
            Platform::GitHub => &self.github,
            Platform::GitLab => &self.gitlab,
            Platform::AzureDevOps => &self.azure_devops,
        }
    }

    fn platform_mut(&mut self, platform: Platform) -> &mut PlatformConfig {
        match platform {
            Platform::GitHub => &mut self.github,
            Platform::GitLab => &mut self.gitlab,
            Platform::AzureDevOps => &mut self.azure_devops,
        }
    }

    /// Enabled platforms, in processing order.
    pub fn enabled_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| self.platform(*p).enabled)
            .collect()
    }

    /// Effective API base URL for `platform`, without a trailing slash.
    pub fn api_url(&self, platform: Platform) -> String {
        self.platform(platform)
            .api_url
            .as_deref()
            .unwrap_or(platform.default_api_url())
            .trim_end_matches('/')
            .to_string()
    }

    /// Location of the commit database.
    pub fn database_path(&self) -> PathBuf {
        self.census.data_dir.join("commitcensus.db")
    }

    /// Start of the rolling window ending at `now`, clamped to the earliest
    /// representable instant.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        Duration::try_days(i64::from(self.census.window_days))
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Resolve each platform's token from its environment variable.
    ///
    /// Missing variables log a warning but do **not** fail -- collection
    /// needs tokens, reporting from stored commits does not.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");

        for platform in Platform::ALL {
            let section = self.platform_mut(platform);
            if !section.enabled {
                continue;
            }
            let env_name = section
                .token_env
                .clone()
                .unwrap_or_else(|| default_token_env(platform).to_string());
            let field = format!("{}.token_env", section_name(platform));
            section.token = resolve_optional_env(&env_name, &field);
        }

        debug!("environment variable resolution complete");
        Ok(())
    }

    /// Validate that all values are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.census.window_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "census.window_days".into(),
                detail: "window must be at least one day".into(),
            });
        }
        if self.census.window_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::InvalidValue {
                field: "census.window_days".into(),
                detail: format!("window must be at most {MAX_WINDOW_DAYS} days"),
            });
        }
        if self.http.page_size == 0 || self.http.page_size > 100 {
            return Err(ConfigError::InvalidValue {
                field: "http.page_size".into(),
                detail: "page size must be between 1 and 100".into(),
            });
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "http.timeout_secs".into(),
                detail: "timeout must be > 0".into(),
            });
        }

        for platform in self.enabled_platforms() {
            let section = self.platform(platform);
            let name = section_name(platform);

            if platform == Platform::AzureDevOps
                && section.owner.as_deref().map_or(true, str::is_empty)
            {
                return Err(ConfigError::InvalidValue {
                    field: format!("{name}.owner"),
                    detail: "Azure DevOps requires the organization name".into(),
                });
            }
            if let Some(url) = &section.api_url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ConfigError::InvalidValue {
                        field: format!("{name}.api_url"),
                        detail: format!("'{url}' is not an http(s) URL"),
                    });
                }
            }
            if section.repositories.iter().any(|r| r.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("{name}.repositories"),
                    detail: "repository patterns must not be empty".into(),
                });
            }
            if let Some(file) = &section.exclude_file {
                if !file.exists() {
                    return Err(ConfigError::InvalidValue {
                        field: format!("{name}.exclude_file"),
                        detail: format!("'{}' does not exist", file.display()),
                    });
                }
            }
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_relative_paths(&mut self, base: &Path) {
        for platform in Platform::ALL {
            let section = self.platform_mut(platform);
            if let Some(file) = &section.exclude_file {
                if file.is_relative() {
                    section.exclude_file = Some(base.join(file));
                }
            }
        }
    }
}

/// TOML section name for `platform`.
pub fn section_name(platform: Platform) -> &'static str {
    match platform {
        Platform::GitHub => "github",
        Platform::GitLab => "gitlab",
        Platform::AzureDevOps => "azure_devops",
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[census]
window_days = 30
data_dir = "/tmp/commitcensus"
report_dir = "/tmp/commitcensus/report"
log_level = "debug"

[http]
max_retries = 5
page_size = 50

[github]
owner = "acme"
token_env = "CENSUS_GH_TOKEN"
repositories = ["acme/api", "acme/web-*"]
exclude_pattern = "/noreply\\.github\\.com$/i"

[gitlab]
enabled = false
owner = "acme-group"

[azure_devops]
owner = "acme-org"
exclude_file = "azure-exclude.txt"
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.census.window_days, 30);
        assert_eq!(config.http.max_retries, 5);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.github.owner.as_deref(), Some("acme"));
        assert_eq!(config.github.repositories.len(), 2);
        assert!(config.github.enabled);
        assert!(!config.gitlab.enabled);
        assert_eq!(
            config.enabled_platforms(),
            vec![Platform::GitHub, Platform::AzureDevOps]
        );
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.census.window_days, 90);
        assert_eq!(config.census.log_level, "warn");
        assert_eq!(config.http.page_size, 100);
        assert!(config.enabled_platforms().is_empty());
        assert_eq!(config.api_url(Platform::GitLab), "https://gitlab.com/api/v4");
        assert_eq!(
            config.database_path(),
            PathBuf::from(".commitcensus/commitcensus.db")
        );
    }

    #[test]
    fn test_api_url_override_trims_slash() {
        let config: AppConfig =
            toml::from_str("[gitlab]\napi_url = \"https://git.corp/api/v4/\"\n").unwrap();
        assert_eq!(config.api_url(Platform::GitLab), "https://git.corp/api/v4");
    }

    #[test]
    fn test_load_from_file_resolves_exclude_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commitcensus.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.census.log_level, "debug");
        assert_eq!(
            config.azure_devops.exclude_file,
            Some(dir.path().join("azure-exclude.txt"))
        );
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/commitcensus.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut config: AppConfig = toml::from_str("").unwrap();
        config.census.window_days = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "census.window_days"
        ));
    }

    #[test]
    fn test_validate_rejects_oversized_window() {
        let config: AppConfig = toml::from_str("[census]\nwindow_days = 100000000\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "census.window_days"
        ));

        let mut config: AppConfig = toml::from_str("").unwrap();
        config.census.window_days = MAX_WINDOW_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_azure_organization() {
        let config: AppConfig = toml::from_str("[azure_devops]\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "azure_devops.owner"
        ));
    }

    #[test]
    fn test_validate_rejects_missing_exclude_file() {
        let config: AppConfig =
            toml::from_str("[gitlab]\nexclude_file = \"/nonexistent/rules.txt\"\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "gitlab.exclude_file"
        ));
    }

    #[test]
    fn test_validate_rejects_page_size() {
        let config: AppConfig = toml::from_str("[http]\npage_size = 500\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var("CENSUS_TEST_GL_TOKEN", "glpat-abc");

        let mut config: AppConfig = toml::from_str(
            "[gitlab]\ntoken_env = \"CENSUS_TEST_GL_TOKEN\"\n[github]\nenabled = false\n",
        )
        .unwrap();
        config.resolve_env_vars().unwrap();

        assert_eq!(config.gitlab.token.as_deref(), Some("glpat-abc"));
        assert!(config.github.token.is_none());

        std::env::remove_var("CENSUS_TEST_GL_TOKEN");
    }

    #[test]
    fn test_window_start() {
        let config: AppConfig = toml::from_str("[census]\nwindow_days = 7\n").unwrap();
        let now = DateTime::parse_from_rfc3339("2026-10-17T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            config.window_start(now).to_rfc3339(),
            "2026-10-10T00:00:00+00:00"
        );
    }

    #[test]
    fn test_window_start_clamps_instead_of_overflowing() {
        let mut config: AppConfig = toml::from_str("").unwrap();
        config.census.window_days = u32::MAX;
        let now = DateTime::parse_from_rfc3339("2026-10-17T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(config.window_start(now), DateTime::<Utc>::MIN_UTC);
    }
}
