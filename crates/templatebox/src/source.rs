//! Source descriptions for template sets.
//!
//! A set is either file-backed ([`FileSet`]) or built from literal strings
//! ([`LiteralSet`]). Both are ordered: the first source is the layout and
//! every later source fills in the blocks declared before it.

use std::path::{Path, PathBuf};

use crate::functions::FuncMap;

/// An ordered list of template files plus optional per-set functions.
///
/// Paths are relative to the registry's root directory unless the root is
/// empty, in which case they are used as given. The base name of the first
/// path becomes the set's root name.
///
/// Files after the first can also be referenced by base name from any file of
/// the set, e.g. `{% include "nav.html" %}`; the reference sees the file as
/// written, outside the layout chain.
///
/// ```rust
/// use templatebox::FileSet;
///
/// let set = FileSet::new(["layout.html", "pages/home.html"]);
/// assert_eq!(set.root_name(), Some("layout.html".to_string()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    pub files: Vec<PathBuf>,
    pub funcs: Option<FuncMap>,
}

impl FileSet {
    /// Creates a set from the given paths with no per-set functions.
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            funcs: None,
        }
    }

    /// Attaches per-set functions.
    pub fn with_funcs(mut self, funcs: FuncMap) -> Self {
        self.funcs = Some(funcs);
        self
    }

    /// Appends a file.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Base name of the first file, used as the root name of the compiled set.
    pub fn root_name(&self) -> Option<String> {
        self.files.first().map(|path| base_name(path))
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// An ordered list of template source strings plus optional per-set functions.
///
/// ```rust
/// use templatebox::LiteralSet;
///
/// let set = LiteralSet::new([
///     "<main>{% block content %}{% endblock %}</main>",
///     "{% block content %}hello{% endblock %}",
/// ]);
/// assert_eq!(set.sources.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LiteralSet {
    pub sources: Vec<String>,
    pub funcs: Option<FuncMap>,
}

impl LiteralSet {
    /// Creates a set from the given source strings with no per-set functions.
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            funcs: None,
        }
    }

    /// Attaches per-set functions.
    pub fn with_funcs(mut self, funcs: FuncMap) -> Self {
        self.funcs = Some(funcs);
        self
    }

    /// Appends a source string.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Final path component as a string; the whole path if there is none.
pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_set_root_name() {
        let set = FileSet::new(["pages/a.html", "layout.html"]);
        assert_eq!(set.root_name(), Some("a.html".to_string()));
        assert_eq!(FileSet::default().root_name(), None);
    }

    #[test]
    fn test_file_set_builder() {
        let set = FileSet::default()
            .file("layout.html")
            .file("a.html")
            .with_funcs(FuncMap::new().with("up", |s: String| s.to_uppercase()));
        assert_eq!(set.files.len(), 2);
        assert!(!set.is_empty());
        assert!(set.funcs.is_some());
    }

    #[test]
    fn test_literal_set_builder() {
        let set = LiteralSet::default().source("a").source(String::from("b"));
        assert_eq!(set.sources, vec!["a", "b"]);
        assert!(LiteralSet::default().is_empty());
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("a/b/c.html")), "c.html");
        assert_eq!(base_name(Path::new("c.html")), "c.html");
        assert_eq!(base_name(Path::new("..")), "..");
    }
}
