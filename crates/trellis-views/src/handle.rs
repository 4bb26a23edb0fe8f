//! Reloadable owner of the live registry.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::context::RenderContext;
use crate::error::{LoadError, RenderError};
use crate::registry::{Loader, Registry, ViewEngine};

/// Shared, swappable handle to the current [`Registry`].
///
/// # Thread Safety
///
/// - Uses `RwLock<Arc<Registry>>` for the current snapshot; readers clone
///   the `Arc` and render without holding the lock
/// - Uses `Mutex<()>` to serialize reloads
///
/// A reload builds a complete new registry before touching the live one, so
/// readers never observe a partially loaded tree.
pub struct RegistryHandle {
    loader: Loader,
    root: PathBuf,
    reload_lock: Mutex<()>,
    current: RwLock<Arc<Registry>>,
}

impl RegistryHandle {
    /// Load `root` with `loader` and wrap the result.
    pub fn load(loader: Loader, root: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let root = root.into();
        let registry = loader.load(&root)?;
        Ok(Self {
            loader,
            root,
            reload_lock: Mutex::new(()),
            current: RwLock::new(Arc::new(registry)),
        })
    }

    /// Current registry snapshot.
    ///
    /// Stays valid after a later reload; it just stops being current.
    pub fn current(&self) -> Arc<Registry> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Rebuild the registry from disk and swap it in on success.
    ///
    /// On failure the previous registry stays live and the error is returned.
    pub fn reload(&self) -> Result<Arc<Registry>, LoadError> {
        let _guard = self
            .reload_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match self.loader.load(&self.root) {
            Ok(registry) => {
                let registry = Arc::new(registry);
                *self.current.write().unwrap_or_else(PoisonError::into_inner) =
                    Arc::clone(&registry);
                tracing::info!(root = %self.root.display(), views = registry.len(), "Reloaded views");
                Ok(registry)
            }
            Err(e) => {
                tracing::warn!(
                    root = %self.root.display(),
                    error = %e,
                    "Reload failed, keeping previous views"
                );
                Err(e)
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }
}

impl ViewEngine for RegistryHandle {
    fn contains(&self, name: &str) -> bool {
        self.current().contains(name)
    }

    fn render_view(
        &self,
        name: &str,
        block: &str,
        ctx: &RenderContext,
        sink: &mut dyn Write,
    ) -> Result<(), RenderError> {
        self.current().render_view(name, block, ctx, sink)
    }

    fn region(&self) -> &str {
        &self.loader.config().layout_block
    }
}
