//! Directory-cascading view templates for Trellis.
//!
//! A views tree is a directory of template files organized by convention:
//!
//! - a file named exactly like the layout file (default `Layout.html`) wraps
//!   every page in its directory and below, unless a closer directory
//!   declares its own
//! - files starting with the partial prefix (default `_`) are reusable
//!   fragments visible from their directory and below
//! - every other file is a page, addressed by its root-relative path such as
//!   `App/Profiles/Index.html`
//!
//! # Architecture
//!
//! Loading runs once per tree:
//! - [`Scanner`] walks the root and classifies files
//! - [`ResolutionIndex`] answers "closest layout" and "visible partials"
//!   per directory
//! - [`Compiler`] builds one [`CompiledUnit`] per page with `minijinja`
//! - [`Registry`] maps page names to units and is read-only afterwards
//!
//! [`RegistryHandle`] adds reload and watch on top of a registry, and
//! [`ViewEngine`] abstracts over both.
//!
//! # Example
//!
//! ```ignore
//! use trellis_views::{Registry, RenderContext, ViewEngine, ViewsConfig};
//!
//! let registry = Registry::load("views".as_ref(), ViewsConfig::default())?;
//! let ctx = RenderContext::new().with("title", "Home");
//! registry.render_view("App/Index.html", "main", &ctx, &mut std::io::stdout())?;
//! ```

mod compiler;
mod config;
mod context;
mod error;
mod handle;
mod path;
mod registry;
mod renderer;
mod resolve;
mod scanner;
mod watch;

pub use compiler::{CompiledUnit, Compiler, EnvironmentSetup, Sources};
pub use config::{Delimiters, PartialScope, ViewsConfig};
pub use context::RenderContext;
pub use error::{CompileError, LoadError, RenderError, TraversalError, WatchError};
pub use handle::RegistryHandle;
pub use minijinja::{Environment, Value};
pub use path::{ROOT_DIR, ViewPath, ancestor_dirs, parent_dir};
pub use registry::{Loader, Registry, ViewEngine};
pub use resolve::{Resolution, ResolutionIndex};
pub use scanner::{Classification, LayoutIndex, PartialIndex, ScanResult, Scanner, classify};
pub use watch::{DEFAULT_QUIET_PERIOD, ReloadWatcher};
