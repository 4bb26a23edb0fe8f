//! Loader settings.

/// Which partials are visible to a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartialScope {
    /// Partials of the page's own directory and every ancestor directory.
    #[default]
    Directory,
    /// Every partial in the tree, regardless of location.
    Global,
}

/// Template action delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    /// Opening delimiter, e.g. `{%`.
    pub left: String,
    /// Closing delimiter, e.g. `%}`.
    pub right: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            left: "{%".to_owned(),
            right: "%}".to_owned(),
        }
    }
}

impl Delimiters {
    /// Whether these are the engine's built-in block delimiters.
    pub(crate) fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Check that the pair can be told apart from each other and from the
    /// `{{` / `}}` variable delimiters.
    pub(crate) fn check(&self) -> Result<(), String> {
        if self.left.is_empty() || self.right.is_empty() {
            return Err("delimiters must not be empty".to_owned());
        }
        if self.left == self.right {
            return Err("left and right delimiters must differ".to_owned());
        }
        for delimiter in [&self.left, &self.right] {
            if delimiter == "{{" || delimiter == "}}" {
                return Err(format!("{delimiter:?} is reserved for variables"));
            }
        }
        Ok(())
    }
}

/// Configuration for [`Loader`](crate::Loader).
#[derive(Debug, Clone)]
pub struct ViewsConfig {
    /// File name that marks a layout (default `Layout.html`).
    pub layout_file: String,
    /// File name prefix that marks a partial (default `_`).
    pub partial_prefix: String,
    /// Visibility of partials.
    pub partial_scope: PartialScope,
    /// Layout block that receives the page body (default `main`).
    pub layout_block: String,
    /// Action delimiters.
    pub delimiters: Delimiters,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            layout_file: "Layout.html".to_owned(),
            partial_prefix: "_".to_owned(),
            partial_scope: PartialScope::Directory,
            layout_block: "main".to_owned(),
            delimiters: Delimiters::default(),
        }
    }
}
