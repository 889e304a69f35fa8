//! Configuration management for the triage CLI.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - The YAML config file (`.triage/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with all persisted state under `.triage/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers that can serve completions.
pub const KNOWN_PROVIDERS: &[&str] = &["ollama"];

/// Default JQL used when a closed-ticket event triggers a project update.
pub const DEFAULT_UPDATE_QUERY: &str =
    r#"project = "{project}" AND issuetype in ("Bug", "Story", "Task") ORDER BY created DESC"#;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .triage/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generation provider (only "ollama" is served)
    pub provider: String,

    /// Generation model identifier
    pub model: String,

    /// Generation endpoint override
    pub endpoint: Option<String>,

    /// Generation request timeout in seconds
    pub llm_timeout_secs: u64,

    /// Ticket tracker settings
    pub tracker: TrackerConfig,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Ticket tracker configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Tracker host, e.g. "example.atlassian.net"
    #[serde(default)]
    pub domain: Option<String>,

    /// Environment variable holding the account email
    #[serde(default = "default_email_env")]
    pub email_env: String,

    /// Environment variable holding the API token
    #[serde(default = "default_api_token_env")]
    pub api_token_env: String,

    /// Custom field carrying the root cause analysis
    #[serde(default = "default_root_cause_field")]
    pub root_cause_field: String,

    /// Custom field carrying the root cause category
    #[serde(default = "default_root_cause_category_field")]
    pub root_cause_category_field: String,

    /// Issues requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Request timeout in seconds
    #[serde(default = "default_tracker_timeout")]
    pub timeout: u64,

    /// Status names that count as "closed" for update triggers
    #[serde(default = "default_closed_statuses")]
    pub closed_statuses: Vec<String>,

    /// Query template for closed-ticket updates; `{project}` is substituted
    #[serde(default = "default_update_query")]
    pub update_query: String,
}

fn default_email_env() -> String {
    "JIRA_EMAIL".to_string()
}

fn default_api_token_env() -> String {
    "JIRA_API_TOKEN".to_string()
}

fn default_root_cause_field() -> String {
    "customfield_10048".to_string()
}

fn default_root_cause_category_field() -> String {
    "customfield_10049".to_string()
}

fn default_page_size() -> u32 {
    50
}

fn default_tracker_timeout() -> u64 {
    30
}

fn default_closed_statuses() -> Vec<String> {
    vec!["Done".to_string()]
}

fn default_update_query() -> String {
    DEFAULT_UPDATE_QUERY.to_string()
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            domain: None,
            email_env: default_email_env(),
            api_token_env: default_api_token_env(),
            root_cause_field: default_root_cause_field(),
            root_cause_category_field: default_root_cause_category_field(),
            page_size: default_page_size(),
            timeout: default_tracker_timeout(),
            closed_statuses: default_closed_statuses(),
            update_query: default_update_query(),
        }
    }
}

impl TrackerConfig {
    /// Browse URL prefix for ticket links, e.g. `https://host/browse/`.
    pub fn browse_base(&self) -> String {
        match &self.domain {
            Some(domain) => format!("https://{}/browse/", domain),
            None => String::new(),
        }
    }

    /// Render the update query for a project key.
    pub fn update_query_for(&self, project_key: &str) -> String {
        self.update_query.replace("{project}", project_key)
    }

    /// Whether a status name counts as closed.
    pub fn is_closed_status(&self, status: &str) -> bool {
        self.closed_statuses.iter().any(|s| s == status)
    }
}

/// Tracker credentials resolved from the environment.
#[derive(Debug, Clone)]
pub struct TrackerCredentials {
    pub email: String,
    pub api_token: String,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    tracker: Option<TrackerConfig>,
    workspace: Option<WorkspaceSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    endpoint: Option<String>,
    model: Option<String>,
    timeout: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            endpoint: None,
            llm_timeout_secs: 120,
            tracker: TrackerConfig::default(),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and environment variables.
    ///
    /// Environment variables:
    /// - `TRIAGE_WORKSPACE`: Override workspace path
    /// - `TRIAGE_CONFIG`: Path to config file
    /// - `TRIAGE_PROVIDER`: Generation provider
    /// - `TRIAGE_MODEL`: Generation model
    /// - `TRIAGE_LLM_ENDPOINT`: Generation endpoint
    /// - `JIRA_DOMAIN`: Tracker host
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("TRIAGE_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("TRIAGE_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.workspace.join(".triage/config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("TRIAGE_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("TRIAGE_MODEL") {
            config.model = model;
        }

        if let Ok(endpoint) = std::env::var("TRIAGE_LLM_ENDPOINT") {
            config.endpoint = Some(endpoint);
        }

        if let Ok(domain) = std::env::var("JIRA_DOMAIN") {
            config.tracker.domain = Some(domain);
        }

        config.log_level = std::env::var("RUST_LOG").ok().or(config.log_level);

        if std::env::var_os("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.clone().merge_file(config_file))
    }

    fn merge_file(mut self, file: ConfigFile) -> Self {
        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                self.provider = provider;
            }
            if let Some(model) = llm.model {
                self.model = model;
            }
            if llm.endpoint.is_some() {
                self.endpoint = llm.endpoint;
            }
            if let Some(timeout) = llm.timeout {
                self.llm_timeout_secs = timeout;
            }
        }

        if let Some(tracker) = file.tracker {
            self.tracker = tracker;
        }

        self
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .triage directory.
    pub fn triage_dir(&self) -> PathBuf {
        self.workspace.join(".triage")
    }

    /// Ensure the .triage directory exists.
    pub fn ensure_triage_dir(&self) -> AppResult<()> {
        let triage_dir = self.triage_dir();
        if !triage_dir.exists() {
            std::fs::create_dir_all(&triage_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .triage directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolve tracker credentials from the configured environment variables.
    pub fn resolve_tracker_credentials(&self) -> AppResult<TrackerCredentials> {
        let read = |var: &str| {
            std::env::var(var).map_err(|_| {
                AppError::Config(format!(
                    "Tracker credential not found in environment variable: {}",
                    var
                ))
            })
        };

        Ok(TrackerCredentials {
            email: read(&self.tracker.email_env)?,
            api_token: read(&self.tracker.api_token_env)?,
        })
    }

    /// Validate configuration for the generation provider.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.tracker.page_size == 0 {
            return Err(AppError::Config(
                "tracker.pageSize must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate that the tracker can be contacted.
    pub fn validate_tracker(&self) -> AppResult<&str> {
        self.tracker.domain.as_deref().ok_or_else(|| {
            AppError::Config(
                "Tracker domain is not configured (set tracker.domain or JIRA_DOMAIN)".to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.tracker.page_size, 50);
        assert_eq!(config.tracker.closed_statuses, vec!["Done".to_string()]);
        assert!(!config.verbose);
    }

    #[test]
    fn test_triage_dir() {
        let config = AppConfig::default();
        assert!(config.triage_dir().ends_with(".triage"));
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("mistral".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.model, "mistral");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  provider: ollama
  model: qwen2.5
  timeout: 45
tracker:
  domain: acme.atlassian.net
  rootCauseField: customfield_20001
  closedStatuses: ["Done", "Closed"]
logging:
  level: warn
  color: false
"#,
        )
        .unwrap();

        let config = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(config.model, "qwen2.5");
        assert_eq!(config.llm_timeout_secs, 45);
        assert_eq!(config.tracker.domain.as_deref(), Some("acme.atlassian.net"));
        assert_eq!(config.tracker.root_cause_field, "customfield_20001");
        assert_eq!(config.tracker.root_cause_category_field, "customfield_10049");
        assert!(config.tracker.is_closed_status("Closed"));
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert!(config.no_color);
    }

    #[test]
    fn test_update_query_and_browse_base() {
        let tracker = TrackerConfig {
            domain: Some("acme.atlassian.net".to_string()),
            ..Default::default()
        };
        assert_eq!(tracker.browse_base(), "https://acme.atlassian.net/browse/");
        assert!(tracker
            .update_query_for("OPS")
            .starts_with(r#"project = "OPS" AND"#));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let config = AppConfig {
            provider: "unknown".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_tracker_requires_domain() {
        let config = AppConfig::default();
        assert!(config.validate_tracker().is_err());
    }
}
