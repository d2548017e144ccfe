//! Registered project roots, derived from marker files.
//!
//! A project root is the directory containing a marker file (by convention
//! `.devtools`) found anywhere under one of a window's opened folders. A
//! buffer is in scope for outbound sync iff its path sits under one of the
//! registered roots.

use std::path::{Path, PathBuf};

/// The set of registered project root prefixes.
#[derive(Debug, Clone, Default)]
pub struct ProjectRoots {
    roots: Vec<PathBuf>,
}

impl ProjectRoots {
    /// Rebuild the root set from discovered marker file paths: each
    /// marker's containing directory becomes a root. Duplicates collapse.
    pub fn replace_from_markers(&mut self, markers: &[PathBuf]) {
        let mut roots: Vec<PathBuf> = markers
            .iter()
            .filter_map(|marker| marker.parent().map(Path::to_path_buf))
            .collect();
        roots.sort();
        roots.dedup();
        self.roots = roots;
    }

    /// Whether `file` lies under any registered root.
    pub fn contains(&self, file: &Path) -> bool {
        self.roots.iter().any(|root| file.starts_with(root))
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_filename_is_stripped() {
        let mut roots = ProjectRoots::default();
        roots.replace_from_markers(&[PathBuf::from("/p/sub/.devtools")]);
        assert_eq!(roots.paths(), &[PathBuf::from("/p/sub")]);
    }

    #[test]
    fn nested_and_direct_markers() {
        let mut roots = ProjectRoots::default();
        roots.replace_from_markers(&[
            PathBuf::from("/p/.devtools"),
            PathBuf::from("/p/deep/nested/.devtools"),
        ]);
        assert!(roots.contains(Path::new("/p/src/main.js")));
        assert!(roots.contains(Path::new("/p/deep/nested/a.js")));
        assert!(!roots.contains(Path::new("/q/src/main.js")));
    }

    #[test]
    fn duplicate_markers_collapse() {
        let mut roots = ProjectRoots::default();
        roots.replace_from_markers(&[
            PathBuf::from("/p/.devtools"),
            PathBuf::from("/p/.devtools"),
        ]);
        assert_eq!(roots.paths().len(), 1);
    }

    #[test]
    fn prefix_match_is_per_component() {
        let mut roots = ProjectRoots::default();
        roots.replace_from_markers(&[PathBuf::from("/p/sub/.devtools")]);
        // "/p/subway" must not count as being under "/p/sub".
        assert!(!roots.contains(Path::new("/p/subway/a.js")));
        assert!(roots.contains(Path::new("/p/sub/a.js")));
    }

    #[test]
    fn rescan_replaces_previous_roots() {
        let mut roots = ProjectRoots::default();
        roots.replace_from_markers(&[PathBuf::from("/p/.devtools")]);
        roots.replace_from_markers(&[PathBuf::from("/q/.devtools")]);
        assert!(!roots.contains(Path::new("/p/a.js")));
        assert!(roots.contains(Path::new("/q/a.js")));
        assert!(!roots.is_empty());
    }

    #[test]
    fn empty_set_contains_nothing() {
        let roots = ProjectRoots::default();
        assert!(roots.is_empty());
        assert!(!roots.contains(Path::new("/p/a.js")));
    }
}
