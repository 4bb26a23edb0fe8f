//! Conversion from [`trellis_config::Config`] to runtime settings.

use std::sync::Arc;

use trellis_config::{Config, ElementScope};
use trellis_views::{Delimiters, LoadError, Loader, PartialScope, RegistryHandle, ViewsConfig};

/// Controller settings that are not needed for loading views.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Name pattern with two `%v` placeholders (e.g. `%v/%v.html`).
    pub default_pattern: String,
    /// Directory holding error pages.
    pub errors_dir: String,
    /// Value of the `Content-Type` header.
    pub content_type: String,
    /// Development mode: expose error details to error pages.
    pub dev_mode: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            default_pattern: "%v/%v.html".to_owned(),
            errors_dir: "Errors".to_owned(),
            content_type: "text/html; charset=utf-8".to_owned(),
            dev_mode: false,
        }
    }
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        let templates = &config.templates;
        Self {
            default_pattern: templates.default.pattern.clone(),
            errors_dir: templates.errors.dir.clone(),
            content_type: templates.content.content_type.clone(),
            dev_mode: config.mode.dev,
        }
    }
}

/// Loader settings from the `layout`, `element`, and `delim` keys.
pub fn views_config(config: &Config) -> ViewsConfig {
    let templates = &config.templates;
    ViewsConfig {
        layout_file: templates.layout.file.clone(),
        partial_prefix: templates.element.prefix.clone(),
        partial_scope: match templates.element.scope {
            ElementScope::Directory => PartialScope::Directory,
            ElementScope::Global => PartialScope::Global,
        },
        layout_block: templates.layout.block.clone(),
        delimiters: Delimiters {
            left: templates.delim.left.clone(),
            right: templates.delim.right.clone(),
        },
    }
}

/// A loader for the configured views.
pub fn loader(config: &Config) -> Loader {
    Loader::new(views_config(config))
}

/// Load the configured views directory into a reloadable handle.
pub fn load_views(config: &Config) -> Result<Arc<RegistryHandle>, LoadError> {
    RegistryHandle::load(loader(config), config.views_dir.clone()).map(Arc::new)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_views_config_defaults() {
        let views = views_config(&Config::default());
        assert_eq!(views.layout_file, "Layout.html");
        assert_eq!(views.partial_prefix, "_");
        assert_eq!(views.partial_scope, PartialScope::Directory);
        assert_eq!(views.layout_block, "main");
        assert_eq!(views.delimiters, Delimiters::default());
    }

    #[test]
    fn test_views_config_from_pairs() {
        let config = Config::from_pairs(
            [
                ("layout.file", "Base.html"),
                ("layout.block", "content"),
                ("element.scope", "global"),
                ("delim.left", "<%"),
                ("delim.right", "%>"),
            ],
            Path::new("/srv/app"),
        )
        .unwrap();

        let views = views_config(&config);
        assert_eq!(views.layout_file, "Base.html");
        assert_eq!(views.layout_block, "content");
        assert_eq!(views.partial_scope, PartialScope::Global);
        assert_eq!(views.delimiters.left, "<%");
        assert_eq!(views.delimiters.right, "%>");
    }

    #[test]
    fn test_controller_settings_from_config() {
        let config = Config::from_pairs(
            [
                ("errors.dir", "errors"),
                ("content.type", "text/plain"),
                ("mode.dev", "true"),
            ],
            Path::new("/srv/app"),
        )
        .unwrap();

        let settings = ControllerSettings::from_config(&config);
        assert_eq!(settings.errors_dir, "errors");
        assert_eq!(settings.content_type, "text/plain");
        assert_eq!(settings.default_pattern, "%v/%v.html");
        assert!(settings.dev_mode);
    }

    #[test]
    fn test_load_views_reads_views_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let views = temp_dir.path().join("views");
        std::fs::create_dir_all(views.join("Home")).unwrap();
        std::fs::write(views.join("Home/Index.html"), "home").unwrap();

        let config = Config::from_pairs([("views.path", "views")], temp_dir.path()).unwrap();
        let handle = load_views(&config).unwrap();

        assert!(handle.current().lookup("Home/Index.html").is_some());
    }
}
