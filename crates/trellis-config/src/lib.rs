//! Configuration management for Trellis views.
//!
//! Parses `trellis.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! Every setting is a flat `key = value` pair with a default. In a TOML file
//! the template keys live in a `[templates]` table and use dotted keys:
//!
//! ```toml
//! [templates]
//! layout.file = "Layout.html"
//! layout.block = "main"
//! element.prefix = "_"
//! views.path = "./views/"
//!
//! [mode]
//! dev = true
//! ```
//!
//! The same settings can be supplied as flat pairs via [`Config::from_pairs`],
//! and CLI settings can be applied during load via [`CliSettings`].

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override views directory.
    pub views_dir: Option<PathBuf>,
    /// Override development mode flag.
    pub dev_mode: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "trellis.toml";

/// Flat keys that belong to the `[mode]` table rather than `[templates]`.
const MODE_PREFIX: &str = "mode.";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Template settings.
    pub templates: TemplatesConfig,
    /// Process mode settings.
    pub mode: ModeConfig,

    /// Resolved views directory (set after loading).
    #[serde(skip)]
    pub views_dir: PathBuf,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Template settings (`[templates]` table).
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    /// `layout.*` keys.
    pub layout: LayoutConfig,
    /// `element.*` keys.
    pub element: ElementConfig,
    /// `views.*` keys.
    pub views: ViewsConfig,
    /// `default.*` keys.
    pub default: DefaultConfig,
    /// `errors.*` keys.
    pub errors: ErrorsConfig,
    /// `content.*` keys.
    pub content: ContentConfig,
    /// `delim.*` keys.
    pub delim: DelimConfig,
}

/// Layout file and region settings.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Name of the layout template file.
    pub file: String,
    /// Name of the layout block that receives page content.
    pub block: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            file: "Layout.html".to_owned(),
            block: "main".to_owned(),
        }
    }
}

/// Which partials a page can see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementScope {
    /// Partials of the page's directory and all of its ancestors.
    #[default]
    Directory,
    /// Every partial in the views tree.
    Global,
}

/// Element (partial) template settings.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElementConfig {
    /// File name prefix that marks a partial.
    pub prefix: String,
    /// Visibility of partials.
    pub scope: ElementScope,
}

impl Default for ElementConfig {
    fn default() -> Self {
        Self {
            prefix: "_".to_owned(),
            scope: ElementScope::Directory,
        }
    }
}

/// Views directory settings.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewsConfig {
    /// Path to the directory with views, relative to the config file.
    pub path: String,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            path: "./views/".to_owned(),
        }
    }
}

/// Default template naming settings.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultConfig {
    /// Pattern mapping controller and action names to a page name.
    /// Each `%v` is replaced in order.
    pub pattern: String,
}

impl Default for DefaultConfig {
    fn default() -> Self {
        Self {
            pattern: "%v/%v.html".to_owned(),
        }
    }
}

/// Error page settings.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ErrorsConfig {
    /// Directory (relative to views) with error templates.
    pub dir: String,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            dir: "Errors".to_owned(),
        }
    }
}

/// Response content settings.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Value of the `Content-Type` header.
    #[serde(rename = "type")]
    pub content_type: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            content_type: "text/html; charset=utf-8".to_owned(),
        }
    }
}

/// Template action delimiters.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DelimConfig {
    /// Left action delimiter.
    pub left: String,
    /// Right action delimiter.
    pub right: String,
}

impl Default for DelimConfig {
    fn default() -> Self {
        Self {
            left: "{%".to_owned(),
            right: "%}".to_owned(),
        }
    }
}

/// Process mode settings (`[mode]` table).
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModeConfig {
    /// Development mode: error details in pages and live template reload.
    pub dev: bool,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error (includes unknown keys).
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Flat key that cannot be placed in the configuration tree.
    #[error("Invalid configuration key: {0}")]
    InvalidKey(String),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a value usable as a template block name.
fn require_identifier(value: &str, field: &str) -> Result<(), ConfigError> {
    let mut chars = value.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(ConfigError::Validation(format!(
            "{field} must be an identifier, got {value:?}"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `trellis.toml` in current directory and parents.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or a value is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Build configuration from flat `key = value` pairs.
    ///
    /// Keys use the dotted names of the `[templates]` table (`layout.file`,
    /// `element.prefix`, ...) plus `mode.dev`. Values of `mode.*` keys are
    /// read as booleans, everything else as strings. Relative paths resolve
    /// against `base`.
    ///
    /// # Errors
    ///
    /// Returns error for unknown keys or invalid values.
    pub fn from_pairs<I, K, V>(pairs: I, base: &Path) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut root = toml::Table::new();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            if let Some(mode_key) = key.strip_prefix(MODE_PREFIX) {
                insert_dotted(&mut root, "mode", mode_key, key, parse_flag(value))?;
            } else {
                let value = toml::Value::String(value.to_owned());
                insert_dotted(&mut root, "templates", key, key, value)?;
            }
        }

        let mut config: Self = toml::Value::Table(root).try_into()?;
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(views_dir) = &settings.views_dir {
            self.views_dir.clone_from(views_dir);
        }
        if let Some(dev_mode) = settings.dev_mode {
            self.mode.dev = dev_mode;
        }
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file or pairs.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let templates = &self.templates;

        require_non_empty(&templates.layout.file, "layout.file")?;
        if templates.layout.file.contains('/') {
            return Err(ConfigError::Validation(
                "layout.file must be a file name, not a path".to_owned(),
            ));
        }
        require_identifier(&templates.layout.block, "layout.block")?;
        require_non_empty(&templates.element.prefix, "element.prefix")?;
        require_non_empty(&templates.views.path, "views.path")?;

        let placeholders = templates.default.pattern.matches("%v").count();
        if placeholders != 2 {
            return Err(ConfigError::Validation(format!(
                "default.pattern must contain exactly two %v placeholders, found {placeholders}"
            )));
        }

        require_non_empty(&templates.errors.dir, "errors.dir")?;
        require_non_empty(&templates.content.content_type, "content.type")?;
        require_non_empty(&templates.delim.left, "delim.left")?;
        require_non_empty(&templates.delim.right, "delim.right")?;
        if templates.delim.left == templates.delim.right {
            return Err(ConfigError::Validation(
                "delim.left and delim.right must differ".to_owned(),
            ));
        }
        let delimiters = [
            (&templates.delim.left, "delim.left"),
            (&templates.delim.right, "delim.right"),
        ];
        for (delim, field) in delimiters {
            if delim == "{{" || delim == "}}" {
                return Err(ConfigError::Validation(format!(
                    "{field} cannot be {delim:?}, it is reserved for variables"
                )));
            }
        }

        Ok(())
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        let mut config = Self {
            templates: TemplatesConfig::default(),
            mode: ModeConfig::default(),
            views_dir: PathBuf::new(),
            config_path: None,
        };
        config.resolve_paths(base);
        config
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Resolve `views.path` against the config directory, expanding `~`.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let expanded = shellexpand::tilde(&self.templates.views.path);
        self.views_dir = config_dir.join(expanded.as_ref());
    }
}

/// Read a `mode.*` value. Anything but `true`/`false` stays a string and
/// fails deserialization with the key in the message.
fn parse_flag(value: &str) -> toml::Value {
    match value {
        "true" => toml::Value::Boolean(true),
        "false" => toml::Value::Boolean(false),
        other => toml::Value::String(other.to_owned()),
    }
}

/// Insert `value` at `table.key` (dotted) below the `section` table.
fn insert_dotted(
    root: &mut toml::Table,
    section: &str,
    key: &str,
    full_key: &str,
    value: toml::Value,
) -> Result<(), ConfigError> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidKey(full_key.to_owned()));
    }

    let mut table = root
        .entry(section)
        .or_insert(toml::Value::Table(toml::Table::new()));
    for part in &parts[..parts.len() - 1] {
        let toml::Value::Table(inner) = table else {
            return Err(ConfigError::InvalidKey(full_key.to_owned()));
        };
        table = inner
            .entry(*part)
            .or_insert(toml::Value::Table(toml::Table::new()));
    }

    let toml::Value::Table(inner) = table else {
        return Err(ConfigError::InvalidKey(full_key.to_owned()));
    };
    let last = parts[parts.len() - 1];
    if inner.contains_key(last) {
        return Err(ConfigError::InvalidKey(full_key.to_owned()));
    }
    inner.insert(last.to_owned(), value);
    Ok(())
}
