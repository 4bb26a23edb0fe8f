//! Directory-proximity resolution of layouts and partials.
//!
//! Layouts do not accumulate: the closest one wins. Partials accumulate
//! upward through every ancestor directory, nearest directory first.

use crate::config::PartialScope;
use crate::path::{ViewPath, ancestor_dirs, parent_dir};
use crate::scanner::{LayoutIndex, PartialIndex};

/// Layout and partials that apply to one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Closest layout, if any.
    pub layout: Option<ViewPath>,
    /// Visible partials in composition order.
    pub partials: Vec<ViewPath>,
}

/// Answers proximity queries over the indexes produced by the scanner.
///
/// Immutable after construction, so every query is pure and repeatable.
#[derive(Debug)]
pub struct ResolutionIndex {
    layouts: LayoutIndex,
    partials: PartialIndex,
    scope: PartialScope,
}

impl ResolutionIndex {
    pub fn new(layouts: LayoutIndex, partials: PartialIndex, scope: PartialScope) -> Self {
        Self {
            layouts,
            partials,
            scope,
        }
    }

    /// Closest layout for `dir`: its own, else the nearest ancestor's.
    ///
    /// Returns `None` only when no directory up to and including the root
    /// declares one.
    pub fn resolve_layout(&self, dir: &str) -> Option<&ViewPath> {
        if let Some(layout) = self.layouts.get(dir) {
            return Some(layout);
        }
        self.resolve_layout(parent_dir(dir)?)
    }

    /// Partials visible from `dir`.
    ///
    /// With [`PartialScope::Directory`], `dir`'s own partials come first,
    /// followed by those of each ancestor, root last. With
    /// [`PartialScope::Global`], every partial in the tree in path order.
    pub fn resolve_partials(&self, dir: &str) -> Vec<ViewPath> {
        match self.scope {
            PartialScope::Directory => self.directory_partials(dir),
            PartialScope::Global => {
                let mut all: Vec<ViewPath> = self.partials.values().flatten().cloned().collect();
                all.sort();
                all
            }
        }
    }

    fn directory_partials(&self, dir: &str) -> Vec<ViewPath> {
        ancestor_dirs(dir)
            .into_iter()
            .filter_map(|d| self.partials.get(d))
            .flatten()
            .cloned()
            .collect()
    }

    /// Both queries at once.
    pub fn resolve(&self, dir: &str) -> Resolution {
        Resolution {
            layout: self.resolve_layout(dir).cloned(),
            partials: self.resolve_partials(dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vp(s: &str) -> ViewPath {
        ViewPath::parse(s).unwrap()
    }

    fn names(list: &[ViewPath]) -> Vec<&str> {
        list.iter().map(ViewPath::as_str).collect()
    }

    /// Layout.html, _header.html, App/Index.html, App/Profiles/{Index,Layout,_side}.html
    fn scenario_a() -> ResolutionIndex {
        let mut layouts = LayoutIndex::new();
        layouts.insert(".".to_owned(), vp("Layout.html"));
        layouts.insert("App/Profiles".to_owned(), vp("App/Profiles/Layout.html"));

        let mut partials = PartialIndex::new();
        partials.insert(".".to_owned(), vec![vp("_header.html")]);
        partials.insert("App/Profiles".to_owned(), vec![vp("App/Profiles/_side.html")]);

        ResolutionIndex::new(layouts, partials, PartialScope::Directory)
    }

    fn layered() -> ResolutionIndex {
        let mut partials = PartialIndex::new();
        partials.insert(".".to_owned(), vec![vp("_r1.html"), vp("_r2.html")]);
        partials.insert("App".to_owned(), vec![vp("App/_a1.html")]);
        partials.insert(
            "App/Profiles".to_owned(),
            vec![vp("App/Profiles/_p1.html"), vp("App/Profiles/_p2.html")],
        );

        let mut layouts = LayoutIndex::new();
        layouts.insert("App".to_owned(), vp("App/Layout.html"));
        layouts.insert("App/Profiles".to_owned(), vp("App/Profiles/Layout.html"));
        layouts.insert("Messages".to_owned(), vp("Messages/Layout.html"));

        ResolutionIndex::new(layouts, partials, PartialScope::Directory)
    }

    #[test]
    fn test_scenario_a_layouts() {
        let index = scenario_a();
        assert_eq!(index.resolve_layout("App"), Some(&vp("Layout.html")));
        assert_eq!(
            index.resolve_layout("App/Profiles"),
            Some(&vp("App/Profiles/Layout.html"))
        );
    }

    #[test]
    fn test_scenario_a_partials() {
        let index = scenario_a();
        assert_eq!(
            names(&index.resolve_partials("App/Profiles")),
            vec!["App/Profiles/_side.html", "_header.html"]
        );
        assert_eq!(names(&index.resolve_partials("App")), vec!["_header.html"]);
    }

    #[test]
    fn test_layout_own_directory_wins() {
        let index = layered();
        assert_eq!(index.resolve_layout("."), None);
        assert_eq!(index.resolve_layout("App"), Some(&vp("App/Layout.html")));
        assert_eq!(
            index.resolve_layout("App/Profiles"),
            Some(&vp("App/Profiles/Layout.html"))
        );
        assert_eq!(index.resolve_layout("Errors"), None);
        assert_eq!(
            index.resolve_layout("Messages/Test"),
            Some(&vp("Messages/Layout.html"))
        );
    }

    #[test]
    fn test_layout_deep_directory_walks_to_ancestor() {
        let index = layered();
        assert_eq!(
            index.resolve_layout("App/Profiles/Edit/Deep"),
            Some(&vp("App/Profiles/Layout.html"))
        );
    }

    #[test]
    fn test_layout_root_without_layout_terminates() {
        let index = ResolutionIndex::new(
            LayoutIndex::new(),
            PartialIndex::new(),
            PartialScope::Directory,
        );
        assert_eq!(index.resolve_layout("."), None);
    }

    #[test]
    fn test_layout_resolution_is_idempotent() {
        let index = layered();
        for dir in [".", "App", "App/Profiles", "Messages/Test", "Errors"] {
            assert_eq!(index.resolve_layout(dir), index.resolve_layout(dir));
        }
    }

    #[test]
    fn test_partials_nearest_first() {
        let index = layered();
        assert_eq!(
            names(&index.resolve_partials(".")),
            vec!["_r1.html", "_r2.html"]
        );
        assert_eq!(
            names(&index.resolve_partials("App")),
            vec!["App/_a1.html", "_r1.html", "_r2.html"]
        );
        assert_eq!(
            names(&index.resolve_partials("App/Profiles")),
            vec![
                "App/Profiles/_p1.html",
                "App/Profiles/_p2.html",
                "App/_a1.html",
                "_r1.html",
                "_r2.html"
            ]
        );
    }

    #[test]
    fn test_partials_extend_parent_result() {
        let index = layered();
        for (dir, parent) in [("App/Profiles", "App"), ("App", "."), ("Errors/Deep", "Errors")] {
            let own = index.resolve_partials(dir);
            let inherited = index.resolve_partials(parent);
            assert!(own.ends_with(&inherited), "{dir} should end with {parent}'s partials");
            let declared = index.partials.get(dir).map_or(0, Vec::len);
            assert_eq!(own.len(), declared + inherited.len());
        }
    }

    #[test]
    fn test_partials_global_scope() {
        let mut partials = PartialIndex::new();
        partials.insert(".".to_owned(), vec![vp("_r1.html")]);
        partials.insert("App".to_owned(), vec![vp("App/_a1.html")]);
        partials.insert("Blog".to_owned(), vec![vp("Blog/_b1.html")]);
        let index = ResolutionIndex::new(LayoutIndex::new(), partials, PartialScope::Global);

        let expected = vec!["App/_a1.html", "Blog/_b1.html", "_r1.html"];
        assert_eq!(names(&index.resolve_partials("App")), expected);
        assert_eq!(names(&index.resolve_partials(".")), expected);
    }

    #[test]
    fn test_resolve_combines_both() {
        let index = scenario_a();
        let resolution = index.resolve("App/Profiles");
        assert_eq!(resolution.layout, Some(vp("App/Profiles/Layout.html")));
        assert_eq!(
            names(&resolution.partials),
            vec!["App/Profiles/_side.html", "_header.html"]
        );
    }
}
