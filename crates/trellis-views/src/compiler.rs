//! Composition of a page with its layout and partials.
//!
//! Each page becomes one [`CompiledUnit`]: a template environment holding
//! the page, its resolved layout, and every visible partial in a single
//! namespace. A page with a layout extends it, and its body fills the
//! layout's region block. A page without a layout is compiled verbatim.
//!
//! Top-level `block` sections of a page fill the layout's slots of the same
//! name and are not repeated inside the region. A page that defines the
//! region block itself only extends the layout.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::Environment;
use minijinja::syntax::SyntaxConfig;
use regex::Regex;

use crate::config::ViewsConfig;
use crate::error::{CompileError, LoadError};
use crate::path::ViewPath;

/// Hook run on every unit's environment before any template is added.
///
/// Used to register helper functions, filters, and globals.
pub type EnvironmentSetup = Arc<dyn Fn(&mut Environment<'static>) + Send + Sync>;

/// A page compiled together with its layout and partials.
///
/// Immutable once built. Rendering borrows it shared, so one unit can serve
/// any number of concurrent renders.
pub struct CompiledUnit {
    pub(crate) name: ViewPath,
    pub(crate) layout: Option<ViewPath>,
    pub(crate) partials: Vec<ViewPath>,
    pub(crate) region: String,
    pub(crate) blocks: BTreeSet<String>,
    pub(crate) env: Environment<'static>,
}

impl CompiledUnit {
    /// Registered name: the page's own view path.
    pub fn name(&self) -> &ViewPath {
        &self.name
    }

    pub fn layout(&self) -> Option<&ViewPath> {
        self.layout.as_ref()
    }

    /// Partials in composition order, nearest directory first.
    pub fn partials(&self) -> &[ViewPath] {
        &self.partials
    }

    /// Block name that addresses the whole document.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Blocks declared by the page and its layout.
    pub fn blocks(&self) -> &BTreeSet<String> {
        &self.blocks
    }

    pub fn has_block(&self, name: &str) -> bool {
        name == self.region || self.blocks.contains(name)
    }
}

impl fmt::Debug for CompiledUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledUnit")
            .field("name", &self.name)
            .field("layout", &self.layout)
            .field("partials", &self.partials)
            .field("region", &self.region)
            .field("blocks", &self.blocks)
            .finish_non_exhaustive()
    }
}

/// Layout and partial sources shared by every page of one load.
///
/// Each file is read once, so all units of a registry see the same text.
#[derive(Debug, Default)]
pub struct Sources {
    files: HashMap<ViewPath, String>,
}

impl Sources {
    /// Read `files` under `root`, skipping duplicates.
    pub fn read<'a, I>(root: &Path, files: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = &'a ViewPath>,
    {
        let mut sources = HashMap::new();
        for file in files {
            if sources.contains_key(file) {
                continue;
            }
            let text = fs::read_to_string(root.join(file.as_str())).map_err(|source| {
                LoadError::Read {
                    file: file.clone(),
                    source,
                }
            })?;
            sources.insert(file.clone(), text);
        }
        Ok(Self { files: sources })
    }

    pub fn get(&self, file: &ViewPath) -> Option<&str> {
        self.files.get(file).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Builds compiled units from files under a views root.
pub struct Compiler {
    root: PathBuf,
    region: String,
    left: String,
    right: String,
    syntax: Option<SyntaxConfig>,
    block_pattern: Regex,
    tag_pattern: Regex,
    setup: Option<EnvironmentSetup>,
}

impl Compiler {
    /// Create a compiler for `root`.
    ///
    /// Fails if the configured delimiters do not form a valid syntax.
    pub fn new(
        root: &Path,
        config: &ViewsConfig,
        setup: Option<EnvironmentSetup>,
    ) -> Result<Self, LoadError> {
        let delimiters = &config.delimiters;
        let invalid = |reason: String| LoadError::Delimiters {
            left: delimiters.left.clone(),
            right: delimiters.right.clone(),
            reason,
        };
        delimiters.check().map_err(invalid)?;
        let syntax = if delimiters.is_default() {
            None
        } else {
            let syntax = SyntaxConfig::builder()
                .block_delimiters(delimiters.left.clone(), delimiters.right.clone())
                .build()
                .map_err(|e| invalid(e.to_string()))?;
            Some(syntax)
        };

        let block_pattern = Regex::new(&format!(
            r"{}[-+]?\s*block\s+([A-Za-z_][A-Za-z0-9_]*)",
            regex::escape(&delimiters.left)
        ))?;
        let tag_pattern = Regex::new(&format!(
            r"(?s){}[-+]?\s*(?:block\s+([A-Za-z_][A-Za-z0-9_]*)|endblock\b).*?{}",
            regex::escape(&delimiters.left),
            regex::escape(&delimiters.right)
        ))?;

        Ok(Self {
            root: root.to_path_buf(),
            region: config.layout_block.clone(),
            left: delimiters.left.clone(),
            right: delimiters.right.clone(),
            syntax,
            block_pattern,
            tag_pattern,
            setup,
        })
    }

    /// Compile `page` with its resolved `layout` and `partials`.
    ///
    /// The page itself is read from disk; the layout and partials come from
    /// `sources`. Partials are registered under their full path and under
    /// their file name. When two share a file name, the first in `partials`
    /// (the nearest) owns the short name.
    pub fn compile(
        &self,
        page: &ViewPath,
        layout: Option<&ViewPath>,
        partials: &[ViewPath],
        sources: &Sources,
    ) -> Result<CompiledUnit, CompileError> {
        let mut env = self.environment();
        let mut registered = HashSet::new();

        for partial in partials {
            let source = shared(sources, page, partial)?;
            for name in [partial.file_name(), partial.as_str()] {
                if registered.insert(name.to_owned()) {
                    self.add(&mut env, page, partial, name.to_owned(), source.to_owned())?;
                }
            }
        }

        let mut blocks = BTreeSet::new();

        let body = self.read(page, page)?;
        blocks.extend(self.declared_blocks(&body));

        let entry = match layout {
            Some(layout) => {
                let layout_source = shared(sources, page, layout)?;
                let layout_blocks = self.declared_blocks(layout_source);
                if !layout_blocks.contains(&self.region) {
                    return Err(CompileError::MissingRegion {
                        page: page.clone(),
                        layout: layout.clone(),
                        region: self.region.clone(),
                    });
                }
                blocks.extend(layout_blocks);
                self.add(
                    &mut env,
                    page,
                    layout,
                    layout.as_str().to_owned(),
                    layout_source.to_owned(),
                )?;
                self.wrap_in_layout(layout, &body)
            }
            None => body,
        };

        // The region name always means "the whole document"
        blocks.remove(&self.region);

        self.add(&mut env, page, page, page.as_str().to_owned(), entry)?;

        Ok(CompiledUnit {
            name: page.clone(),
            layout: layout.cloned(),
            partials: partials.to_vec(),
            region: self.region.clone(),
            blocks,
            env,
        })
    }

    fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        if let Some(syntax) = &self.syntax {
            env.set_syntax(syntax.clone());
        }
        if let Some(setup) = &self.setup {
            setup(&mut env);
        }
        env
    }

    fn read(&self, page: &ViewPath, file: &ViewPath) -> Result<String, CompileError> {
        fs::read_to_string(self.root.join(file.as_str())).map_err(|source| CompileError::Read {
            page: page.clone(),
            file: file.clone(),
            source,
        })
    }

    fn add(
        &self,
        env: &mut Environment<'static>,
        page: &ViewPath,
        file: &ViewPath,
        name: String,
        source: String,
    ) -> Result<(), CompileError> {
        env.add_template_owned(name, source)
            .map_err(|source| CompileError::Syntax {
                page: page.clone(),
                file: file.clone(),
                source,
            })
    }

    /// Page source that extends `layout` and fills its region with `body`.
    ///
    /// Top-level blocks of `body` are moved after the region so they only
    /// fill their slots. If `body` already defines the region it is kept
    /// as written.
    fn wrap_in_layout(&self, layout: &ViewPath, body: &str) -> String {
        let (l, r, region) = (&self.left, &self.right, &self.region);
        let extends = format!("{l} extends {name:?} {r}", name = layout.as_str());

        let sections = self.top_level_blocks(body);
        if sections.iter().any(|(name, _)| name == region) {
            return format!("{extends}{body}");
        }

        let mut content = String::with_capacity(body.len());
        let mut definitions = String::new();
        let mut cursor = 0;
        for (_, span) in sections {
            content.push_str(&body[cursor..span.start]);
            definitions.push_str(&body[span.clone()]);
            cursor = span.end;
        }
        content.push_str(&body[cursor..]);

        format!("{extends}{l} block {region} {r}{content}{l} endblock {r}{definitions}")
    }

    /// Top-level `block` sections of `source` with their byte ranges,
    /// from the opening tag through the matching `endblock`.
    ///
    /// An unclosed section is left out, so the parser reports it in place.
    fn top_level_blocks(&self, source: &str) -> Vec<(String, Range<usize>)> {
        let mut sections = Vec::new();
        let mut open: Option<(String, usize)> = None;
        let mut depth = 0usize;

        for caps in self.tag_pattern.captures_iter(source) {
            let Some(tag) = caps.get(0) else { continue };
            if let Some(name) = caps.get(1) {
                if depth == 0 {
                    open = Some((name.as_str().to_owned(), tag.start()));
                }
                depth += 1;
            } else if depth > 0 {
                depth -= 1;
                if depth == 0
                    && let Some((name, start)) = open.take()
                {
                    sections.push((name, start..tag.end()));
                }
            }
        }
        sections
    }

    /// Names of `block` tags in a template source.
    fn declared_blocks(&self, source: &str) -> BTreeSet<String> {
        self.block_pattern
            .captures_iter(source)
            .map(|caps| caps[1].to_owned())
            .collect()
    }
}

fn shared<'s>(
    sources: &'s Sources,
    page: &ViewPath,
    file: &ViewPath,
) -> Result<&'s str, CompileError> {
    sources.get(file).ok_or_else(|| CompileError::Read {
        page: page.clone(),
        file: file.clone(),
        source: io::Error::new(io::ErrorKind::NotFound, "source was not loaded"),
    })
}
