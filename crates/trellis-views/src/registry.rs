//! Loading a views tree into an immutable registry.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use minijinja::Environment;
use rayon::prelude::*;

use crate::compiler::{CompiledUnit, Compiler, EnvironmentSetup, Sources};
use crate::config::ViewsConfig;
use crate::context::RenderContext;
use crate::error::{LoadError, RenderError};
use crate::path::ViewPath;
use crate::resolve::{Resolution, ResolutionIndex};
use crate::scanner::Scanner;

/// Something that can render views by name.
///
/// Implemented by [`Registry`] and [`RegistryHandle`](crate::RegistryHandle),
/// so consumers can take either a fixed registry or a reloadable one.
pub trait ViewEngine: Send + Sync {
    /// Whether a view is registered under `name`.
    fn contains(&self, name: &str) -> bool;

    /// Render `block` of the view `name` into `sink`.
    ///
    /// Fails with [`RenderError::NotFound`] when no view has that name.
    fn render_view(
        &self,
        name: &str,
        block: &str,
        ctx: &RenderContext,
        sink: &mut dyn Write,
    ) -> Result<(), RenderError>;

    /// Block name that renders a whole document.
    fn region(&self) -> &str;
}

/// Builds [`Registry`] values from a views root.
///
/// # Example
///
/// ```ignore
/// use trellis_views::{Loader, ViewsConfig};
///
/// let loader = Loader::new(ViewsConfig::default());
/// let registry = loader.load("views".as_ref())?;
/// ```
#[derive(Clone)]
pub struct Loader {
    config: ViewsConfig,
    setup: Option<EnvironmentSetup>,
}

impl Loader {
    #[must_use]
    pub fn new(config: ViewsConfig) -> Self {
        Self {
            config,
            setup: None,
        }
    }

    /// Register a hook run on every unit's environment before parsing.
    ///
    /// Use it to add helper functions, filters, or globals.
    #[must_use]
    pub fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&mut Environment<'static>) + Send + Sync + 'static,
    {
        self.setup = Some(Arc::new(setup));
        self
    }

    pub fn config(&self) -> &ViewsConfig {
        &self.config
    }

    /// Scan `root`, resolve every page directory, and compile all pages.
    ///
    /// All or nothing: the first traversal or compile error aborts the load
    /// and no registry is produced.
    pub fn load(&self, root: &Path) -> Result<Registry, LoadError> {
        let start = Instant::now();

        let scanner = Scanner::new(
            root.to_path_buf(),
            self.config.layout_file.clone(),
            self.config.partial_prefix.clone(),
        );
        let scan = scanner.scan()?;
        let index = ResolutionIndex::new(scan.layouts, scan.partials, self.config.partial_scope);

        let mut resolutions: HashMap<&str, Resolution> = HashMap::new();
        for page in &scan.pages {
            let dir = page.dir();
            resolutions
                .entry(dir)
                .or_insert_with(|| index.resolve(dir));
        }

        let shared = resolutions
            .values()
            .flat_map(|resolution| resolution.layout.iter().chain(&resolution.partials));
        let sources = Sources::read(root, shared)?;

        let compiler = Compiler::new(root, &self.config, self.setup.clone())?;
        let compiled = scan
            .pages
            .par_iter()
            .map(|page| -> Result<CompiledUnit, LoadError> {
                let resolution = &resolutions[page.dir()];
                let unit = compiler.compile(
                    page,
                    resolution.layout.as_ref(),
                    &resolution.partials,
                    &sources,
                )?;
                tracing::debug!(
                    page = %page,
                    layout = resolution.layout.as_ref().map(ViewPath::as_str),
                    partials = resolution.partials.len(),
                    "Compiled view"
                );
                Ok(unit)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let units: BTreeMap<ViewPath, CompiledUnit> = compiled
            .into_iter()
            .map(|unit| (unit.name.clone(), unit))
            .collect();

        tracing::info!(
            root = %root.display(),
            views = units.len(),
            shared = sources.len(),
            elapsed = ?start.elapsed(),
            "Loaded views"
        );

        Ok(Registry {
            root: root.to_path_buf(),
            region: self.config.layout_block.clone(),
            units,
        })
    }
}

/// Immutable map from view name to compiled unit.
///
/// Built once by [`Loader::load`] and only read afterwards, so it can be
/// shared across threads freely.
#[derive(Debug)]
pub struct Registry {
    root: PathBuf,
    region: String,
    units: BTreeMap<ViewPath, CompiledUnit>,
}

impl Registry {
    /// Shorthand for `Loader::new(config).load(root)`.
    pub fn load(root: &Path, config: ViewsConfig) -> Result<Self, LoadError> {
        Loader::new(config).load(root)
    }

    /// Look up a compiled unit. Absence is not an error.
    pub fn lookup(&self, name: &str) -> Option<&CompiledUnit> {
        self.units.get(name)
    }

    /// Registered names in path order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(ViewPath::as_str)
    }

    pub fn units(&self) -> impl Iterator<Item = &CompiledUnit> {
        self.units.values()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl ViewEngine for Registry {
    fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    fn render_view(
        &self,
        name: &str,
        block: &str,
        ctx: &RenderContext,
        sink: &mut dyn Write,
    ) -> Result<(), RenderError> {
        self.lookup(name)
            .ok_or_else(|| RenderError::NotFound(name.to_owned()))?
            .render(block, ctx, sink)
    }

    fn region(&self) -> &str {
        &self.region
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::thread;

    use super::*;
    use crate::config::{Delimiters, PartialScope};
    use crate::error::CompileError;
    use pretty_assertions::assert_eq;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn render(registry: &Registry, name: &str, ctx: &RenderContext) -> String {
        let mut out = Vec::new();
        registry.render_view(name, "main", ctx, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    /// Scenario A tree with renderable content.
    fn site(root: &Path) {
        write(
            root,
            "Layout.html",
            "<body>{% include '_header.html' %}{% block main %}{% endblock %}</body>\n",
        );
        write(root, "_header.html", "<header>{{ title }}</header>");
        write(root, "App/Index.html", "<p>app</p>");
        write(
            root,
            "App/Profiles/Layout.html",
            "<div>{% include '_side.html' %}{% block main %}{% endblock %}</div>\n",
        );
        write(root, "App/Profiles/_side.html", "<aside>side</aside>");
        write(root, "App/Profiles/Index.html", "<p>{{ user }}</p>");
        write(root, "Errors/404.html", "not found\n");
    }

    #[test]
    fn test_load_registers_every_page() {
        let temp_dir = tempfile::tempdir().unwrap();
        site(temp_dir.path());

        let registry = Registry::load(temp_dir.path(), ViewsConfig::default()).unwrap();

        let names: Vec<_> = registry.names().collect();
        assert_eq!(
            names,
            vec!["App/Index.html", "App/Profiles/Index.html", "Errors/404.html"]
        );
        assert_eq!(registry.len(), 3);
        assert!(registry.lookup("Layout.html").is_none());
        assert!(registry.lookup("_header.html").is_none());
    }

    #[test]
    fn test_load_resolves_nearest_layout() {
        let temp_dir = tempfile::tempdir().unwrap();
        site(temp_dir.path());
        let registry = Registry::load(temp_dir.path(), ViewsConfig::default()).unwrap();

        let app = registry.lookup("App/Index.html").unwrap();
        assert_eq!(app.layout().map(ViewPath::as_str), Some("Layout.html"));

        let profiles = registry.lookup("App/Profiles/Index.html").unwrap();
        assert_eq!(
            profiles.layout().map(ViewPath::as_str),
            Some("App/Profiles/Layout.html")
        );
        let partials: Vec<_> = profiles.partials().iter().map(ViewPath::as_str).collect();
        assert_eq!(partials, vec!["App/Profiles/_side.html", "_header.html"]);
    }

    #[test]
    fn test_render_layout_with_partial() {
        let temp_dir = tempfile::tempdir().unwrap();
        site(temp_dir.path());
        let registry = Registry::load(temp_dir.path(), ViewsConfig::default()).unwrap();

        let ctx = RenderContext::new().with("title", "Trellis");
        assert_eq!(
            render(&registry, "App/Index.html", &ctx),
            "<body><header>Trellis</header><p>app</p></body>\n"
        );

        let ctx = RenderContext::new().with("user", "ann");
        assert_eq!(
            render(&registry, "App/Profiles/Index.html", &ctx),
            "<div><aside>side</aside><p>ann</p></div>\n"
        );
    }

    #[test]
    fn test_static_page_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let content = "<!doctype html>\n<p>plain &amp; simple</p>\n\n";
        write(temp_dir.path(), "Static.html", content);

        let registry = Registry::load(temp_dir.path(), ViewsConfig::default()).unwrap();
        assert_eq!(render(&registry, "Static.html", &RenderContext::new()), content);
    }

    #[test]
    fn test_root_page_without_layout() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), "Index.html", "root {{ n }}");

        let registry = Registry::load(temp_dir.path(), ViewsConfig::default()).unwrap();
        let unit = registry.lookup("Index.html").unwrap();
        assert!(unit.layout().is_none());
        assert_eq!(
            render(&registry, "Index.html", &RenderContext::new().with("n", 1)),
            "root 1"
        );
    }

    #[test]
    fn test_layout_missing_region_aborts_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(
            temp_dir.path(),
            "Layout.html",
            "<html>{% block content %}{% endblock %}</html>",
        );
        write(temp_dir.path(), "Index.html", "<p>body</p>");

        let err = Registry::load(temp_dir.path(), ViewsConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Compile(CompileError::MissingRegion { .. })
        ));
    }

    #[test]
    fn test_syntax_error_aborts_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), "Good.html", "fine");
        write(temp_dir.path(), "Bad.html", "{% for %}");

        let err = Registry::load(temp_dir.path(), ViewsConfig::default()).unwrap_err();
        match err {
            LoadError::Compile(CompileError::Syntax { page, .. }) => {
                assert_eq!(page.as_str(), "Bad.html");
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_root_is_traversal_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = Registry::load(&temp_dir.path().join("nope"), ViewsConfig::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Traversal(_)));
    }

    #[test]
    fn test_lookup_missing_then_fallback() {
        let temp_dir = tempfile::tempdir().unwrap();
        site(temp_dir.path());
        let registry = Registry::load(temp_dir.path(), ViewsConfig::default()).unwrap();

        assert!(registry.lookup("Missing/Page.html").is_none());
        assert!(!registry.contains("Missing/Page.html"));
        let fallback = registry.lookup("Errors/404.html").unwrap();
        assert_eq!(fallback.name().as_str(), "Errors/404.html");

        let err = registry
            .render_view("Missing/Page.html", "main", &RenderContext::new(), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, RenderError::NotFound(ref name) if name == "Missing/Page.html"));
    }

    #[test]
    fn test_concurrent_renders_are_independent() {
        let temp_dir = tempfile::tempdir().unwrap();
        site(temp_dir.path());
        let registry = Registry::load(temp_dir.path(), ViewsConfig::default()).unwrap();

        thread::scope(|scope| {
            let handles: Vec<_> = ["ann", "bob"]
                .into_iter()
                .map(|user| {
                    let registry = &registry;
                    scope.spawn(move || {
                        let ctx = RenderContext::new().with("user", user);
                        (0..50)
                            .map(|_| render(registry, "App/Profiles/Index.html", &ctx))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            for (handle, user) in handles.into_iter().zip(["ann", "bob"]) {
                let expected = format!("<div><aside>side</aside><p>{user}</p></div>\n");
                for output in handle.join().unwrap() {
                    assert_eq!(output, expected);
                }
            }
        });
    }

    #[test]
    fn test_helper_function_from_setup() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), "Index.html", "{{ shout(word) }}");
        write(temp_dir.path(), "Wrong.html", "{{ shout('a', 'b') }}");

        let registry = Loader::new(ViewsConfig::default())
            .with_setup(|env| env.add_function("shout", |s: String| s.to_uppercase()))
            .load(temp_dir.path())
            .unwrap();

        let ctx = RenderContext::new().with("word", "hey");
        assert_eq!(render(&registry, "Index.html", &ctx), "HEY");

        let err = registry
            .render_view("Wrong.html", "main", &ctx, &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, RenderError::Execution { .. }));
    }

    #[test]
    fn test_global_partial_scope() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), "Blog/_card.html", "card");
        write(temp_dir.path(), "App/Index.html", "{% include '_card.html' %}");

        let config = ViewsConfig {
            partial_scope: PartialScope::Global,
            ..ViewsConfig::default()
        };
        let registry = Registry::load(temp_dir.path(), config).unwrap();
        assert_eq!(
            render(&registry, "App/Index.html", &RenderContext::new()),
            "card"
        );
    }

    #[test]
    fn test_directory_scope_hides_sibling_partials() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), "Blog/_card.html", "card");
        write(temp_dir.path(), "App/Index.html", "{% include '_card.html' %}");

        let registry = Registry::load(temp_dir.path(), ViewsConfig::default()).unwrap();
        let err = registry
            .render_view("App/Index.html", "main", &RenderContext::new(), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, RenderError::Execution { .. }));
    }

    #[test]
    fn test_invalid_delimiters_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), "Index.html", "x");

        let config = ViewsConfig {
            delimiters: Delimiters {
                left: "{{".to_owned(),
                right: "}}".to_owned(),
            },
            ..ViewsConfig::default()
        };
        let err = Registry::load(temp_dir.path(), config).unwrap_err();
        assert!(matches!(err, LoadError::Delimiters { .. }));
    }

    #[test]
    fn test_load_page_that_supplies_region() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(
            temp_dir.path(),
            "Layout.html",
            "<title>{% block title %}Site{% endblock %}</title><main>{% block main %}{% endblock %}</main>",
        );
        write(
            temp_dir.path(),
            "Index.html",
            "{% block main %}<p>body</p>{% endblock %}",
        );
        write(
            temp_dir.path(),
            "About.html",
            "{% block title %}About{% endblock %}<p>about</p>",
        );

        let registry = Registry::load(temp_dir.path(), ViewsConfig::default()).unwrap();
        let ctx = RenderContext::new();

        assert_eq!(
            render(&registry, "Index.html", &ctx),
            "<title>Site</title><main><p>body</p></main>"
        );
        assert_eq!(
            render(&registry, "About.html", &ctx),
            "<title>About</title><main><p>about</p></main>"
        );
    }
}
