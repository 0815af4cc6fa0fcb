//! Read-only template archives.
//!
//! An [`Archive`] is an immutable, in-memory set of template files keyed by
//! relative path. It backs a registry built with
//! [`Registry::from_archive`](crate::Registry::from_archive) when templates
//! ship inside the binary instead of being read from a live directory.
//!
//! # Sources
//!
//! - Static `(path, content)` pairs, typically produced with `include_str!`
//!   ([`Archive::from_entries`]).
//! - A one-time snapshot of a directory tree ([`Archive::from_dir`]). Later
//!   edits to the directory are not visible through the archive.
//! - With the `include-dir` feature, a directory embedded at compile time with
//!   `include_dir::include_dir!`.
//!
//! # Paths
//!
//! Keys always use forward slashes and never contain `.` or `..` segments:
//! `"templates/./pages/../layout.html"` and `"templates/layout.html"` name the
//! same entry.
//!
//! ```rust
//! use templatebox::Archive;
//!
//! let archive = Archive::from_entries(&[
//!     ("templates/layout.html", "<html>{% block content %}{% endblock %}</html>"),
//!     ("templates/home.html", "{% block content %}home{% endblock %}"),
//! ]);
//!
//! assert_eq!(archive.len(), 2);
//! assert!(archive.contains("templates/./home.html"));
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path};

use crate::error::RegistryError;

/// An immutable collection of template files addressed by relative path.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    entries: BTreeMap<String, Cow<'static, str>>,
}

impl Archive {
    /// Creates an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an archive from static `(path, content)` pairs.
    ///
    /// When two entries normalize to the same path, the later one wins.
    pub fn from_entries(entries: &'static [(&'static str, &'static str)]) -> Self {
        let mut archive = Self::new();
        for (path, content) in entries {
            archive.insert(*path, *content);
        }
        archive
    }

    /// Snapshots every UTF-8 file below `root` into a new archive.
    ///
    /// Keys are relative to `root`. Files that are not valid UTF-8 are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DirectoryNotFound`] if `root` does not exist and
    /// [`RegistryError::Read`] if a directory or file cannot be read.
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(RegistryError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut archive = Self::new();
        snapshot_dir(root, root, &mut archive)?;
        tracing::debug!(root = %root.display(), files = archive.len(), "archive snapshot taken");
        Ok(archive)
    }

    /// Adds or replaces an entry. Intended for building an archive before it
    /// is handed to a registry; a registry never mutates its archive.
    pub fn insert(&mut self, path: impl AsRef<Path>, content: impl Into<Cow<'static, str>>) {
        self.entries.insert(normalize(path.as_ref()), content.into());
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with_entry(
        mut self,
        path: impl AsRef<Path>,
        content: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.insert(path, content);
        self
    }

    /// Returns the content stored at `path`.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.entries
            .get(&normalize(path.as_ref()))
            .map(|content| content.as_ref())
    }

    /// Returns true if an entry exists at `path`.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.entries.contains_key(&normalize(path.as_ref()))
    }

    /// Iterates over all entry paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(feature = "include-dir")]
impl From<&'static include_dir::Dir<'static>> for Archive {
    /// Collects every UTF-8 file of an embedded directory, keyed by its path
    /// relative to the embedded root.
    fn from(dir: &'static include_dir::Dir<'static>) -> Self {
        let mut archive = Archive::new();
        collect_embedded(dir, &mut archive);
        archive
    }
}

#[cfg(feature = "include-dir")]
fn collect_embedded(dir: &include_dir::Dir<'_>, archive: &mut Archive) {
    for file in dir.files() {
        if let Some(content) = file.contents_utf8() {
            archive.insert(file.path(), content.to_owned());
        }
    }
    for sub in dir.dirs() {
        collect_embedded(sub, archive);
    }
}

/// Converts a path into an archive key: forward slashes, no `.` segments,
/// `..` applied, no root or prefix.
pub(crate) fn normalize(path: &Path) -> String {
    let mut parts: Vec<Cow<'_, str>> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy()),
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    parts.join("/")
}

fn snapshot_dir(current: &Path, root: &Path, archive: &mut Archive) -> Result<(), RegistryError> {
    let read_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| RegistryError::Read { path, source }
    };

    for entry in fs::read_dir(current).map_err(read_err(current))? {
        let path = entry.map_err(read_err(current))?.path();

        if path.is_dir() {
            snapshot_dir(&path, root, archive)?;
            continue;
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::InvalidData => continue,
            Err(source) => return Err(RegistryError::Read { path, source }),
        };

        if let Ok(relative) = path.strip_prefix(root) {
            tracing::trace!(path = %relative.display(), "archived template file");
            archive.insert(relative, content);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_file(dir: &Path, relative_path: &str, content: &str) {
        let full_path = dir.join(relative_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full_path, content).unwrap();
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("a/b.html")), "a/b.html");
        assert_eq!(normalize(Path::new("./a/./b.html")), "a/b.html");
        assert_eq!(normalize(Path::new("a/c/../b.html")), "a/b.html");
        assert_eq!(normalize(Path::new("/a/b.html")), "a/b.html");
        assert_eq!(normalize(Path::new("")), "");
    }

    #[test]
    fn test_from_entries() {
        let archive = Archive::from_entries(&[("t/a.html", "A"), ("t/b.html", "B")]);
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.get("t/a.html"), Some("A"));
        assert_eq!(archive.get(Path::new("t").join("b.html")), Some("B"));
        assert_eq!(archive.get("t/c.html"), None);
    }

    #[test]
    fn test_from_entries_later_wins() {
        let archive = Archive::from_entries(&[("a.html", "first"), ("./a.html", "second")]);
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.get("a.html"), Some("second"));
    }

    #[test]
    fn test_builder_and_paths() {
        let archive = Archive::new()
            .with_entry("z.html", "z")
            .with_entry("a.html", String::from("a"));
        let paths: Vec<&str> = archive.paths().collect();
        assert_eq!(paths, vec!["a.html", "z.html"]);
        assert!(!archive.is_empty());
    }

    #[test]
    fn test_from_dir_snapshots_nested_files() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "layout.html", "layout");
        create_file(temp_dir.path(), "pages/home.html", "home");

        let archive = Archive::from_dir(temp_dir.path()).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.get("layout.html"), Some("layout"));
        assert_eq!(archive.get("pages/home.html"), Some("home"));
    }

    #[test]
    fn test_from_dir_is_a_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "a.html", "before");

        let archive = Archive::from_dir(temp_dir.path()).unwrap();
        create_file(temp_dir.path(), "a.html", "after");

        assert_eq!(archive.get("a.html"), Some("before"));
    }

    #[test]
    fn test_from_dir_skips_binary_files() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "a.html", "text");
        fs::write(temp_dir.path().join("logo.png"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let archive = Archive::from_dir(temp_dir.path()).unwrap();
        assert_eq!(archive.len(), 1);
        assert!(!archive.contains("logo.png"));
    }

    #[test]
    fn test_from_dir_missing() {
        let result = Archive::from_dir("/nonexistent/templatebox/dir");
        assert!(matches!(
            result,
            Err(RegistryError::DirectoryNotFound { .. })
        ));
    }
}
