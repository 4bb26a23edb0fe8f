//! Error types for loading and rendering views.

use std::io;
use std::path::PathBuf;

use crate::path::ViewPath;

/// Failure while walking the views tree.
///
/// Fatal to start-up; scanning is never retried.
#[derive(Debug, thiserror::Error)]
pub enum TraversalError {
    /// Views root does not exist.
    #[error("Views directory not found: {}", .0.display())]
    RootMissing(PathBuf),
    /// Views root exists but is not a directory.
    #[error("Views path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    /// A directory or entry could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// A relative path leaves the views root.
    #[error("Path escapes the views root: {}", .0.display())]
    EscapesRoot(PathBuf),
    /// A file name is not valid UTF-8 and cannot be used as a template name.
    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8(PathBuf),
}

/// Failure while compiling one page into a [`CompiledUnit`](crate::CompiledUnit).
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A constituent file could not be read.
    #[error("Failed to read \"{file}\" for page \"{page}\": {source}")]
    Read {
        /// Page being compiled.
        page: ViewPath,
        /// File that failed.
        file: ViewPath,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// A constituent file is not a valid template.
    #[error("Failed to parse \"{file}\" for page \"{page}\": {source}")]
    Syntax {
        /// Page being compiled.
        page: ViewPath,
        /// File that failed.
        file: ViewPath,
        /// Template engine error.
        #[source]
        source: minijinja::Error,
    },
    /// The resolved layout does not declare the region pages are rendered into.
    #[error("Layout \"{layout}\" of page \"{page}\" has no \"{region}\" block")]
    MissingRegion {
        /// Page being compiled.
        page: ViewPath,
        /// Resolved layout.
        layout: ViewPath,
        /// Expected block name.
        region: String,
    },
}

impl CompileError {
    /// Page whose compilation failed.
    pub fn page(&self) -> &ViewPath {
        match self {
            Self::Read { page, .. } | Self::Syntax { page, .. } | Self::MissingRegion { page, .. } => {
                page
            }
        }
    }
}

/// Failure of [`Loader::load`](crate::Loader::load).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Walking the views tree failed.
    #[error(transparent)]
    Traversal(#[from] TraversalError),
    /// A layout or partial could not be read.
    #[error("Failed to read \"{file}\": {source}")]
    Read {
        /// File that failed.
        file: ViewPath,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// A page failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// The configured delimiters are not a usable template syntax.
    #[error("Invalid template delimiters {left:?} / {right:?}: {reason}")]
    Delimiters {
        left: String,
        right: String,
        reason: String,
    },
    /// The block scanner could not be built for the configured delimiters.
    #[error("Invalid block pattern: {0}")]
    BlockPattern(#[from] regex::Error),
}

/// Failure of a single render call.
///
/// Never fatal to the process. Output already written to the sink stays
/// written, so callers must treat the response as possibly partial.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No compiled unit is registered under the name.
    #[error("Template \"{0}\" does not exist")]
    NotFound(String),
    /// The unit does not declare the requested block.
    #[error("Template \"{unit}\" has no block \"{block}\"")]
    UnknownBlock {
        /// Unit name.
        unit: String,
        /// Requested block.
        block: String,
    },
    /// Template execution failed partway.
    #[error("Failed to render \"{unit}\": {source}")]
    Execution {
        /// Unit name.
        unit: String,
        /// Template engine error.
        #[source]
        source: minijinja::Error,
    },
    /// Writing to the sink failed.
    #[error("Failed to write output of \"{unit}\": {source}")]
    Write {
        /// Unit name.
        unit: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl RenderError {
    /// Name of the unit the render call targeted.
    pub fn unit_name(&self) -> &str {
        match self {
            Self::NotFound(unit)
            | Self::UnknownBlock { unit, .. }
            | Self::Execution { unit, .. }
            | Self::Write { unit, .. } => unit,
        }
    }
}

/// Failure to start watching the views tree.
#[derive(Debug, thiserror::Error)]
#[error("Failed to watch {}: {source}", .path.display())]
pub struct WatchError {
    /// Watched directory.
    pub path: PathBuf,
    /// Underlying watcher error.
    #[source]
    pub source: notify::Error,
}
