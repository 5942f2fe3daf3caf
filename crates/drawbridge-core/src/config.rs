//! Configuration loading and validation.
//!
//! Config lives at `~/.drawbridge/config.json` and is parsed as JSON5, with
//! `${ENV_VAR}` references substituted before parsing. Every section is
//! optional; accessors fall back to defaults so a missing file still yields a
//! working local setup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub planner: Option<PlannerConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// HTTP port for the prompt/queue service.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address; defaults to all interfaces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
}

fn default_gateway_port() -> u16 {
    4000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Poll endpoint; defaults to the local gateway's `/commands/next`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_url: Option<String>,

    /// Delay between the end of one poll cycle and the start of the next.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// "rules" (default) or an OpenAI-compatible provider id such as "groq".
    #[serde(default = "default_planner_provider")]
    pub provider: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Env var to read the API key from when `api_key` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_planner_model")]
    pub model: String,

    /// Optional file overriding the built-in instruction template. `{prompt}`
    /// inside the template is replaced with the user prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_path: Option<String>,
}

fn default_planner_provider() -> String {
    "rules".to_string()
}

fn default_planner_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

impl PlannerConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret_field(&self.api_key, &self.api_key_env)
    }

    /// Read the instruction template file, expanding `~` in the path.
    pub fn load_prompt_template(&self) -> crate::error::Result<Option<String>> {
        let Some(path) = &self.prompt_path else {
            return Ok(None);
        };
        let expanded = shellexpand::tilde(path).to_string();
        let text = std::fs::read_to_string(&expanded).map_err(|e| {
            crate::error::DrawbridgeError::Config(format!(
                "prompt template {expanded}: {e}"
            ))
        })?;
        Ok(Some(text))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "drawbridge_gateway=debug").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: None,
            filters: Vec::new(),
            output: default_log_output(),
        }
    }
}

fn default_log_format() -> String {
    "plain".to_string()
}

fn default_log_output() -> String {
    "stderr".to_string()
}

/// Resolve a secret: check the direct value first, then the env-var reference.
pub fn resolve_secret_field(direct: &Option<String>, env_var: &Option<String>) -> Option<String> {
    if let Some(val) = direct {
        if !val.is_empty() {
            return Some(val.clone());
        }
    }
    if let Some(env) = env_var {
        if let Ok(val) = std::env::var(env) {
            if !val.is_empty() {
                return Some(val);
            }
        }
    }
    None
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .into_owned()
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file missing, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(crate::error::DrawbridgeError::Io)?;

        // Substitute ${ENV_VAR} references before parsing
        let substituted = substitute_env_vars(&raw);

        let config: Config = json5::from_str(&substituted)
            .map_err(|e| crate::error::DrawbridgeError::Config(e.to_string()))?;

        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Default config file location.
    pub fn config_dir() -> PathBuf {
        data_dir().join("config.json")
    }

    /// Gateway port.
    pub fn gateway_port(&self) -> u16 {
        self.gateway.as_ref().map(|g| g.port).unwrap_or(4000)
    }

    /// Gateway bind address.
    pub fn gateway_bind(&self) -> String {
        self.gateway
            .as_ref()
            .and_then(|g| g.bind.clone())
            .unwrap_or_else(|| "0.0.0.0".to_string())
    }

    /// Poll delay in milliseconds (measured from cycle completion).
    pub fn poll_interval_ms(&self) -> u64 {
        self.plugin
            .as_ref()
            .map(|p| p.poll_interval_ms)
            .unwrap_or(1000)
    }

    /// Poll endpoint URL, derived from the gateway port when unset.
    pub fn poll_url(&self) -> String {
        self.plugin
            .as_ref()
            .and_then(|p| p.poll_url.clone())
            .unwrap_or_else(|| format!("http://127.0.0.1:{}/commands/next", self.gateway_port()))
    }

    /// Planner provider id ("rules" unless configured otherwise).
    pub fn planner_provider(&self) -> String {
        self.planner
            .as_ref()
            .map(|p| p.provider.clone())
            .unwrap_or_else(default_planner_provider)
    }

    /// Get a config value by dotted path (e.g. "gateway.port", "planner.model").
    pub fn get_path(&self, path: &str) -> Option<serde_json::Value> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    /// Set a config value by dotted path, creating intermediate objects.
    pub fn set_path(&mut self, path: &str, value: serde_json::Value) -> anyhow::Result<()> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| anyhow::anyhow!("Config serialization error: {e}"))?;

        let segments: Vec<&str> = path.split('.').collect();
        if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(anyhow::anyhow!("Empty path"));
        }

        // Navigate to the parent of the target key
        let mut current = &mut json;
        for segment in &segments[..segments.len() - 1] {
            let map = current
                .as_object_mut()
                .ok_or_else(|| anyhow::anyhow!("'{segment}' in '{path}' is not an object"))?;
            current = map
                .entry(segment.to_string())
                .or_insert_with(|| serde_json::json!({}));
        }

        // Set the value
        let last = segments[segments.len() - 1];
        let map = current
            .as_object_mut()
            .ok_or_else(|| anyhow::anyhow!("'{last}' in '{path}' is not an object"))?;
        map.insert(last.to_string(), value);

        // Deserialize back
        *self = serde_json::from_value(json)
            .map_err(|e| anyhow::anyhow!("Config deserialization error: {e}"))?;
        Ok(())
    }

    /// Validate config, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if let Some(planner) = &self.planner {
            if planner.provider != "rules" && planner.resolve_api_key().is_none() {
                warnings.push(format!(
                    "Planner '{}' has no API key configured; falling back to rules",
                    planner.provider
                ));
            }
            if let Some(prompt_path) = &planner.prompt_path {
                let expanded = shellexpand::tilde(prompt_path).to_string();
                if !Path::new(&expanded).exists() {
                    errors.push(format!("Planner prompt template not found: {expanded}"));
                }
            }
        }

        if let Some(gw) = &self.gateway {
            if gw.port == 0 {
                errors.push("Gateway port cannot be 0".to_string());
            }
        }

        if let Some(plugin) = &self.plugin {
            if plugin.poll_interval_ms == 0 {
                warnings.push("Poll interval of 0 makes the plugin busy-poll".to_string());
            }
        }

        (warnings, errors)
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }
}

/// Base directory for Drawbridge data: `~/.drawbridge/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".drawbridge")
}
