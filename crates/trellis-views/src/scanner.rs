//! View discovery by filesystem walking.
//!
//! The Scanner only classifies files; it never reads their contents. Parsing
//! is left to the compiler, which receives the indexes built here.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::TraversalError;
use crate::path::ViewPath;

/// Directory → layout declared directly in that directory.
pub type LayoutIndex = BTreeMap<String, ViewPath>;

/// Directory → partials declared directly in that directory, in lexical order.
pub type PartialIndex = BTreeMap<String, Vec<ViewPath>>;

/// Role of a file in the views tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Renderable template named by its path.
    Page,
    /// Wrapping template for its directory and descendants.
    Layout,
    /// Reusable fragment for its directory and descendants.
    Partial,
}

/// Classify a file by its base name.
///
/// The layout rule is checked first, so a file is never both.
pub fn classify(file_name: &str, layout_file: &str, partial_prefix: &str) -> Classification {
    if file_name == layout_file {
        Classification::Layout
    } else if file_name.starts_with(partial_prefix) {
        Classification::Partial
    } else {
        Classification::Page
    }
}

/// Classified contents of a views tree.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Every page, ordered by path.
    pub pages: BTreeSet<ViewPath>,
    /// Layouts by directory.
    pub layouts: LayoutIndex,
    /// Partials by directory.
    pub partials: PartialIndex,
}

/// Walks a views root once and classifies every file.
pub struct Scanner {
    root: PathBuf,
    layout_file: String,
    partial_prefix: String,
}

impl Scanner {
    /// Create a new Scanner.
    ///
    /// # Arguments
    ///
    /// * `root` - Views directory to scan
    /// * `layout_file` - Exact file name of layouts (e.g., "Layout.html")
    /// * `partial_prefix` - File name prefix of partials (e.g., "_")
    pub fn new(root: PathBuf, layout_file: String, partial_prefix: String) -> Self {
        Self {
            root,
            layout_file,
            partial_prefix,
        }
    }

    /// Scan the tree and return the three indexes.
    ///
    /// Entries are visited in lexical order, so results are deterministic.
    pub fn scan(&self) -> Result<ScanResult, TraversalError> {
        let meta = match fs::metadata(&self.root) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TraversalError::RootMissing(self.root.clone()));
            }
            Err(source) => {
                return Err(TraversalError::Io {
                    path: self.root.clone(),
                    source,
                });
            }
        };
        if !meta.is_dir() {
            return Err(TraversalError::NotADirectory(self.root.clone()));
        }

        let mut result = ScanResult::default();
        self.scan_directory(&self.root, Path::new(""), &mut result)?;

        tracing::debug!(
            root = %self.root.display(),
            pages = result.pages.len(),
            layouts = result.layouts.len(),
            partials = result.partials.values().map(Vec::len).sum::<usize>(),
            "Scanned views"
        );
        Ok(result)
    }

    fn scan_directory(
        &self,
        dir_path: &Path,
        rel_dir: &Path,
        result: &mut ScanResult,
    ) -> Result<(), TraversalError> {
        let io_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source| TraversalError::Io { path, source }
        };

        let mut entries = fs::read_dir(dir_path)
            .map_err(io_error(dir_path))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(io_error(dir_path))?;
        entries.sort_by_key(fs::DirEntry::file_name);

        for entry in entries {
            let path = entry.path();
            let rel_path = rel_dir.join(entry.file_name());
            let file_type = entry.file_type().map_err(io_error(&path))?;

            if file_type.is_dir() {
                self.scan_directory(&path, &rel_path, result)?;
                continue;
            }

            if file_type.is_symlink() {
                // Symlinked files count, symlinked directories are not followed
                match fs::metadata(&path) {
                    Ok(target) if target.is_file() => {}
                    Ok(_) => {
                        tracing::debug!(path = %path.display(), "Skipping symlink to non-file");
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping broken symlink");
                        continue;
                    }
                }
            } else if !file_type.is_file() {
                // Sockets, FIFOs and devices
                tracing::debug!(path = %path.display(), "Skipping special file");
                continue;
            }

            let view_path = ViewPath::from_relative(&rel_path)?;
            self.record(view_path, result);
        }

        Ok(())
    }

    fn record(&self, view_path: ViewPath, result: &mut ScanResult) {
        let dir = view_path.dir().to_owned();
        match classify(view_path.file_name(), &self.layout_file, &self.partial_prefix) {
            Classification::Layout => match result.layouts.entry(dir) {
                Entry::Vacant(entry) => {
                    entry.insert(view_path);
                }
                Entry::Occupied(entry) => {
                    tracing::warn!(
                        kept = %entry.get(),
                        ignored = %view_path,
                        "Multiple layouts in one directory, keeping the first"
                    );
                }
            },
            Classification::Partial => {
                result.partials.entry(dir).or_default().push(view_path);
            }
            Classification::Page => {
                result.pages.insert(view_path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn scanner(root: &Path) -> Scanner {
        Scanner::new(root.to_path_buf(), "Layout.html".to_owned(), "_".to_owned())
    }

    fn paths(list: &[ViewPath]) -> Vec<&str> {
        list.iter().map(ViewPath::as_str).collect()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("Layout.html", "Layout.html", "_"), Classification::Layout);
        assert_eq!(classify("_header.html", "Layout.html", "_"), Classification::Partial);
        assert_eq!(classify("Index.html", "Layout.html", "_"), Classification::Page);
        assert_eq!(classify("layout.html", "Layout.html", "_"), Classification::Page);
    }

    #[test]
    fn test_classify_layout_wins_over_prefix() {
        assert_eq!(classify("_Layout.html", "_Layout.html", "_"), Classification::Layout);
    }

    #[test]
    fn test_scan_classifies_tree() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        write(root, "Layout.html", "");
        write(root, "_header.html", "");
        write(root, "App/Index.html", "");
        write(root, "App/Profiles/Index.html", "");
        write(root, "App/Profiles/Layout.html", "");
        write(root, "App/Profiles/_side.html", "");

        let result = scanner(root).scan().unwrap();

        let pages: Vec<_> = result.pages.iter().map(ViewPath::as_str).collect();
        assert_eq!(pages, vec!["App/Index.html", "App/Profiles/Index.html"]);

        assert_eq!(result.layouts.len(), 2);
        assert_eq!(result.layouts["."].as_str(), "Layout.html");
        assert_eq!(
            result.layouts["App/Profiles"].as_str(),
            "App/Profiles/Layout.html"
        );

        assert_eq!(paths(&result.partials["."]), vec!["_header.html"]);
        assert_eq!(
            paths(&result.partials["App/Profiles"]),
            vec!["App/Profiles/_side.html"]
        );
        assert!(!result.partials.contains_key("App"));
    }

    #[test]
    fn test_scan_partials_in_lexical_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        write(root, "_c.html", "");
        write(root, "_a.html", "");
        write(root, "_b.html", "");

        let result = scanner(root).scan().unwrap();
        assert_eq!(
            paths(&result.partials["."]),
            vec!["_a.html", "_b.html", "_c.html"]
        );
    }

    #[test]
    fn test_scan_ignores_directories_as_entries() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("Empty/Nested")).unwrap();
        fs::create_dir_all(root.join("_partials_dir")).unwrap();

        let result = scanner(root).scan().unwrap();
        assert!(result.pages.is_empty());
        assert!(result.layouts.is_empty());
        assert!(result.partials.is_empty());
    }

    #[test]
    fn test_scan_custom_names() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        write(root, "Base.tpl", "");
        write(root, "el_button.tpl", "");
        write(root, "Layout.html", "");

        let scanner = Scanner::new(root.to_path_buf(), "Base.tpl".to_owned(), "el_".to_owned());
        let result = scanner.scan().unwrap();

        assert_eq!(result.layouts["."].as_str(), "Base.tpl");
        assert_eq!(paths(&result.partials["."]), vec!["el_button.tpl"]);
        assert!(result.pages.iter().any(|p| p.as_str() == "Layout.html"));
    }

    #[test]
    fn test_scan_missing_root() {
        let result = scanner(Path::new("/nonexistent/views")).scan();
        assert!(matches!(result, Err(TraversalError::RootMissing(_))));
    }

    #[test]
    fn test_scan_root_is_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("views.html");
        fs::write(&file, "").unwrap();

        let result = scanner(&file).scan();
        assert!(matches!(result, Err(TraversalError::NotADirectory(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_follows_file_symlinks_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("views");
        let outside = temp_dir.path().join("outside");
        write(&outside, "Shared.html", "");
        write(&root, "Index.html", "");
        std::os::unix::fs::symlink(outside.join("Shared.html"), root.join("Shared.html"))
            .unwrap();
        std::os::unix::fs::symlink(&outside, root.join("Linked")).unwrap();

        let result = scanner(&root).scan().unwrap();
        let pages: Vec<_> = result.pages.iter().map(ViewPath::as_str).collect();
        assert_eq!(pages, vec!["Index.html", "Shared.html"]);
    }

    #[test]
    fn test_scan_skips_special_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("views");
        write(&root, "Index.html", "");
        let _socket = std::os::unix::net::UnixListener::bind(root.join("Live.html")).unwrap();

        let result = scanner(&root).scan().unwrap();
        let pages: Vec<_> = result.pages.iter().map(ViewPath::as_str).collect();
        assert_eq!(pages, vec!["Index.html"]);
    }
}
