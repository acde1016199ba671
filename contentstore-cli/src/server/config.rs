use std::env;

use contentstore_lib::localize::{DEFAULT_FALLBACK_LANGUAGE, DEFAULT_LANGUAGES};
use contentstore_lib::Localizer;
use serde::Deserialize;

/// Top-level contentstore.toml configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ContentServerConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub forms: FormsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_content_dir")]
    pub content_dir: String,
    #[serde(default = "default_storage")]
    pub storage: StorageBackend,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Sled,
    Memory,
}

impl StorageBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "file" => Some(Self::File),
            "sled" => Some(Self::Sled),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_fallback_language")]
    pub fallback_language: String,
    #[serde(default = "default_fallback_language")]
    pub default_language: String,
    #[serde(default = "default_public_resources")]
    pub public_resources: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdminConfig {
    #[serde(default)]
    pub tokens: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    Log,
    Webhook,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FormsConfig {
    #[serde(default = "default_notifier")]
    pub notifier: NotifierKind,
    pub webhook_url: Option<String>,
    pub webhook_token: Option<String>,
    #[serde(default = "default_recipient")]
    pub recipient: String,
}

// ── Default value functions ──────────────────────────

fn default_port() -> u16 {
    8080
}

fn default_hostname() -> String {
    "0.0.0.0".to_string()
}

fn default_content_dir() -> String {
    "./data".to_string()
}

fn default_storage() -> StorageBackend {
    StorageBackend::File
}

fn default_languages() -> Vec<String> {
    DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect()
}

fn default_fallback_language() -> String {
    DEFAULT_FALLBACK_LANGUAGE.to_string()
}

fn default_public_resources() -> Vec<String> {
    ["hero", "products", "blog", "testimonials", "faq", "projects"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_notifier() -> NotifierKind {
    NotifierKind::Log
}

fn default_recipient() -> String {
    "sales@example.com".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            hostname: default_hostname(),
            content_dir: default_content_dir(),
            storage: default_storage(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            fallback_language: default_fallback_language(),
            default_language: default_fallback_language(),
            public_resources: default_public_resources(),
        }
    }
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            notifier: default_notifier(),
            webhook_url: None,
            webhook_token: None,
            recipient: default_recipient(),
        }
    }
}

impl ContentConfig {
    pub fn localizer(&self) -> Localizer {
        Localizer::new(self.languages.iter().cloned(), self.fallback_language.clone())
    }

    pub fn is_public(&self, resource: &str) -> bool {
        self.public_resources.iter().any(|r| r == resource)
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ContentServerConfig {
    /// Load configuration from a TOML file, falling back to defaults if the file
    /// doesn't exist or cannot be parsed.
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).unwrap_or_else(|e| {
                tracing::warn!(path, error = %e, "failed to parse config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("CS_HOSTNAME") {
            self.server.hostname = val;
        }

        if let Some(val) = var("CS_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid CS_PORT"),
            }
        }

        if let Some(val) = var("CS_CONTENT_DIR") {
            self.server.content_dir = val;
        }

        if let Some(val) = var("CS_STORAGE") {
            match StorageBackend::parse(&val) {
                Some(storage) => self.server.storage = storage,
                None => tracing::warn!(value = %val, "unknown CS_STORAGE value"),
            }
        }

        // CS_ADMIN_TOKENS: comma separated
        if let Some(val) = var("CS_ADMIN_TOKENS") {
            self.admin.tokens = split_list(&val);
        }

        if let Some(val) = var("CS_NOTIFIER") {
            match val.to_lowercase().as_str() {
                "log" => self.forms.notifier = NotifierKind::Log,
                "webhook" => self.forms.notifier = NotifierKind::Webhook,
                other => tracing::warn!(value = %other, "unknown CS_NOTIFIER value"),
            }
        }

        if let Some(val) = var("CS_WEBHOOK_URL") {
            self.forms.webhook_url = Some(val);
        }

        if let Some(val) = var("CS_WEBHOOK_TOKEN") {
            self.forms.webhook_token = Some(val);
        }
    }
}
