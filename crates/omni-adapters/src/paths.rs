//! Workspace path resolution.
//!
//! Every filesystem action resolves its paths through a [`Workspace`]: a
//! root directory plus a small set of location aliases (`desktop`,
//! `documents`, ...).  Resolution is purely lexical so that targets which do
//! not exist yet can be validated, and any result outside the root is
//! rejected.

use std::path::{Component, Path, PathBuf};

use crate::error::{AdapterError, Result};

/// Location aliases and the subdirectory of the root they map to.  An empty
/// subdirectory means the root itself.
const LOCATIONS: &[(&str, &str)] = &[
    ("desktop", "Desktop"),
    ("documents", "Documents"),
    ("downloads", "Downloads"),
    ("temp", "Temp"),
    ("home", ""),
    ("current", ""),
];

/// Subdirectory for a location alias, if `word` is one.
pub fn location_alias(word: &str) -> Option<&'static str> {
    let word = word.trim().to_lowercase();
    LOCATIONS
        .iter()
        .find(|(alias, _)| *alias == word)
        .map(|(_, dir)| *dir)
}

/// Root directory that every action is confined to.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create a workspace rooted at `root`.  The root is canonicalized when
    /// it exists so prefix checks are reliable across symlinks.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = root.canonicalize().unwrap_or_else(|_| normalize_path(&root));
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for an optional location alias.  Unknown words are treated
    /// as a path relative to the root.
    pub fn location_dir(&self, location: Option<&str>, action: &str) -> Result<PathBuf> {
        match location.map(str::trim).filter(|l| !l.is_empty()) {
            None => Ok(self.root.clone()),
            Some(word) => match location_alias(word) {
                Some(dir) => Ok(self.root.join(dir)),
                None => self.resolve(word, action),
            },
        }
    }

    /// Resolve `raw` against the root.
    pub fn resolve(&self, raw: &str, action: &str) -> Result<PathBuf> {
        self.resolve_from(&self.root, raw, action)
    }

    /// Resolve `raw` against the directory of `location`.
    pub fn resolve_in(&self, location: Option<&str>, raw: &str, action: &str) -> Result<PathBuf> {
        let base = self.location_dir(location, action)?;
        self.resolve_from(&base, raw, action)
    }

    fn resolve_from(&self, base: &Path, raw: &str, action: &str) -> Result<PathBuf> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AdapterError::InvalidParams {
                action: action.to_string(),
                reason: "empty path".into(),
            });
        }

        let candidate = if Path::new(raw).is_absolute() {
            PathBuf::from(raw)
        } else {
            base.join(raw)
        };
        let normalized = normalize_path(&candidate);

        if !normalized.starts_with(&self.root) {
            return Err(AdapterError::PathTraversal {
                action: action.to_string(),
                path: raw.to_string(),
                root: self.root.display().to_string(),
            });
        }
        Ok(normalized)
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                } else {
                    components.push(component);
                }
            }
            Component::CurDir => {}
            _ => components.push(component),
        }
    }
    components.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_map_under_root() {
        let ws = Workspace::new("/srv/omni");
        assert_eq!(
            ws.location_dir(Some("Desktop"), "t").unwrap(),
            PathBuf::from("/srv/omni/Desktop")
        );
        assert_eq!(ws.location_dir(Some("home"), "t").unwrap(), PathBuf::from("/srv/omni"));
        assert_eq!(ws.location_dir(None, "t").unwrap(), PathBuf::from("/srv/omni"));
    }

    #[test]
    fn relative_paths_join_location() {
        let ws = Workspace::new("/srv/omni");
        assert_eq!(
            ws.resolve_in(Some("documents"), "a/b.txt", "t").unwrap(),
            PathBuf::from("/srv/omni/Documents/a/b.txt")
        );
    }

    #[test]
    fn traversal_is_rejected() {
        let ws = Workspace::new("/srv/omni");
        let err = ws.resolve("../../etc/passwd", "delete").unwrap_err();
        assert!(matches!(err, AdapterError::PathTraversal { .. }));
        assert!(ws.resolve("/etc/passwd", "delete").is_err());
        assert!(ws.resolve_in(Some("desktop"), "../../x", "t").is_err());
    }

    #[test]
    fn inner_parent_components_are_fine() {
        let ws = Workspace::new("/srv/omni");
        assert_eq!(
            ws.resolve("a/../b", "t").unwrap(),
            PathBuf::from("/srv/omni/b")
        );
    }

    #[test]
    fn normalize_resolves_components() {
        let p = Path::new("/tmp/sandbox/./sub/../other");
        assert_eq!(normalize_path(p), PathBuf::from("/tmp/sandbox/other"));
    }
}
