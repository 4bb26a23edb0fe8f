//! Normalized view paths and directory ancestry.
//!
//! A [`ViewPath`] is a root-relative, slash-separated file path such as
//! `"App/Profiles/Index.html"`. Directories are plain `&str` values derived
//! from view paths, with the root directory written as [`ROOT_DIR`] (`"."`).

use std::borrow::Borrow;
use std::fmt;
use std::path::{Component, Path};

use crate::error::TraversalError;

/// Sentinel for the views root directory.
pub const ROOT_DIR: &str = ".";

/// Root-relative, slash-normalized path of a view file.
///
/// Never contains the OS separator on platforms where it differs from `/`,
/// and never contains `.` or `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewPath(String);

impl ViewPath {
    /// Build a view path from a path relative to the views root.
    ///
    /// Only normal components are accepted. Absolute paths and `..`
    /// segments would let a name escape the root, so they are rejected.
    pub fn from_relative(rel: &Path) -> Result<Self, TraversalError> {
        let mut segments = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => {
                    let part = part
                        .to_str()
                        .ok_or_else(|| TraversalError::NonUtf8(rel.to_path_buf()))?;
                    segments.push(part);
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(TraversalError::EscapesRoot(rel.to_path_buf()));
                }
            }
        }
        if segments.is_empty() {
            return Err(TraversalError::EscapesRoot(rel.to_path_buf()));
        }
        Ok(Self(segments.join("/")))
    }

    /// Parse an already slash-separated name, e.g. a template name used in a lookup.
    pub fn parse(name: &str) -> Result<Self, TraversalError> {
        Self::from_relative(Path::new(name))
    }

    /// The path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory containing this file, or [`ROOT_DIR`] for root-level files.
    pub fn dir(&self) -> &str {
        match self.0.rsplit_once('/') {
            Some((dir, _)) => dir,
            None => ROOT_DIR,
        }
    }

    /// Last path segment.
    pub fn file_name(&self) -> &str {
        match self.0.rsplit_once('/') {
            Some((_, name)) => name,
            None => &self.0,
        }
    }
}

impl fmt::Display for ViewPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ViewPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ViewPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Parent of a directory, or `None` for the root.
///
/// `"App/Profiles"` → `"App"`, `"App"` → `"."`, `"."` → `None`.
pub fn parent_dir(dir: &str) -> Option<&str> {
    if dir == ROOT_DIR {
        return None;
    }
    match dir.rsplit_once('/') {
        Some((parent, _)) => Some(parent),
        None => Some(ROOT_DIR),
    }
}

/// Build the ancestor chain of a directory, nearest first.
///
/// E.g., `"App/Profiles"` → `["App/Profiles", "App", "."]`
pub fn ancestor_dirs(dir: &str) -> Vec<&str> {
    let mut chain = vec![dir];
    let mut current = dir;
    while let Some(parent) = parent_dir(current) {
        chain.push(parent);
        current = parent;
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_relative_nested() {
        let path = ViewPath::from_relative(Path::new("App/Profiles/Index.html")).unwrap();
        assert_eq!(path.as_str(), "App/Profiles/Index.html");
        assert_eq!(path.dir(), "App/Profiles");
        assert_eq!(path.file_name(), "Index.html");
    }

    #[test]
    fn test_from_relative_root_level() {
        let path = ViewPath::from_relative(Path::new("Index.html")).unwrap();
        assert_eq!(path.dir(), ROOT_DIR);
        assert_eq!(path.file_name(), "Index.html");
    }

    #[test]
    fn test_from_relative_skips_cur_dir() {
        let path = ViewPath::from_relative(Path::new("./App/./Index.html")).unwrap();
        assert_eq!(path.as_str(), "App/Index.html");
    }

    #[test]
    fn test_from_relative_rejects_parent_dir() {
        let result = ViewPath::from_relative(Path::new("App/../../secret.html"));
        assert!(matches!(result, Err(TraversalError::EscapesRoot(_))));
    }

    #[test]
    fn test_from_relative_rejects_absolute() {
        let result = ViewPath::from_relative(Path::new("/etc/passwd"));
        assert!(matches!(result, Err(TraversalError::EscapesRoot(_))));
    }

    #[test]
    fn test_from_relative_rejects_empty() {
        let result = ViewPath::from_relative(&PathBuf::new());
        assert!(matches!(result, Err(TraversalError::EscapesRoot(_))));
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("App/Profiles"), Some("App"));
        assert_eq!(parent_dir("App"), Some(ROOT_DIR));
        assert_eq!(parent_dir(ROOT_DIR), None);
    }

    #[test]
    fn test_ancestor_dirs_root() {
        assert_eq!(ancestor_dirs(ROOT_DIR), vec!["."]);
    }

    #[test]
    fn test_ancestor_dirs_nested() {
        assert_eq!(
            ancestor_dirs("App/Profiles/Edit"),
            vec!["App/Profiles/Edit", "App/Profiles", "App", "."]
        );
    }
}
