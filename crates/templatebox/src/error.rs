//! Error types for the template registry.
//!
//! Every public operation returns [`RegistryError`]. The registry never logs or
//! swallows an error; it always hands the cause back to the caller.

use std::io;
use std::path::PathBuf;

/// Errors produced while constructing a registry, registering sets, or rendering.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// An archive-backed registry was requested without an archive.
    #[error("archive cannot be absent")]
    MissingArchive,

    /// The root directory of a directory-backed registry does not exist.
    #[error("template directory {} does not exist", path.display())]
    DirectoryNotFound { path: PathBuf },

    /// The root directory could not be inspected.
    #[error("failed to stat template directory {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A set was registered with an empty source list.
    #[error("no sources provided for template set \"{name}\"")]
    NoSources { name: String },

    /// A template file could not be read from disk.
    #[error("failed to read template file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A template file is not present in the backing archive.
    #[error("template file {} not found in archive", path.display())]
    ArchiveEntryNotFound { path: PathBuf },

    /// A file of a file-backed set failed to parse.
    #[error("add template \"{name}\" failed: {file}: {source}")]
    Compile {
        name: String,
        file: String,
        #[source]
        source: minijinja::Error,
    },

    /// A literal source string failed to parse.
    #[error("failed to parse template \"{name}\" at index {index}: {source}\nTemplate content:\n{content}")]
    Parse {
        name: String,
        index: usize,
        content: String,
        #[source]
        source: minijinja::Error,
    },

    /// A set inside a batch registration failed. Sets registered earlier in
    /// the same batch stay registered.
    #[error("batch registration stopped at \"{name}\": {source}")]
    Batch {
        name: String,
        #[source]
        source: Box<RegistryError>,
    },

    /// Debug-mode recompilation before a render failed.
    #[error("rebuild of template \"{name}\" failed: {source}")]
    Rebuild {
        name: String,
        #[source]
        source: Box<RegistryError>,
    },

    /// Render was requested for a name that was never registered.
    #[error("template \"{name}\" not found")]
    NotFound { name: String },

    /// Executing a compiled set against the supplied data failed. Output
    /// written to the sink before the failure is left in place.
    #[error("render of template \"{name}\" failed: {source}")]
    Render {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

impl RegistryError {
    /// Returns the set name the error refers to, if any.
    pub fn template_name(&self) -> Option<&str> {
        match self {
            RegistryError::NoSources { name }
            | RegistryError::Compile { name, .. }
            | RegistryError::Parse { name, .. }
            | RegistryError::Batch { name, .. }
            | RegistryError::Rebuild { name, .. }
            | RegistryError::NotFound { name }
            | RegistryError::Render { name, .. } => Some(name),
            RegistryError::MissingArchive
            | RegistryError::DirectoryNotFound { .. }
            | RegistryError::Stat { .. }
            | RegistryError::Read { .. }
            | RegistryError::ArchiveEntryNotFound { .. } => None,
        }
    }

    /// Returns true for [`RegistryError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display_not_found() {
        let err = RegistryError::NotFound {
            name: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "template \"missing\" not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_display_no_sources() {
        let err = RegistryError::NoSources {
            name: "home".to_string(),
        };
        assert!(err.to_string().contains("no sources provided"));
        assert_eq!(err.template_name(), Some("home"));
    }

    #[test]
    fn test_error_display_parse_includes_content() {
        let source = minijinja::Error::new(minijinja::ErrorKind::SyntaxError, "unexpected end");
        let err = RegistryError::Parse {
            name: "t1".to_string(),
            index: 2,
            content: "{{ unclosed".to_string(),
            source,
        };
        let display = err.to_string();
        assert!(display.contains("\"t1\""));
        assert!(display.contains("index 2"));
        assert!(display.contains("{{ unclosed"));
    }

    #[test]
    fn test_stat_exposes_io_source() {
        let err = RegistryError::Stat {
            path: PathBuf::from("/tmp/x"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
        assert_eq!(err.template_name(), None);
    }

    #[test]
    fn test_rebuild_wraps_cause() {
        let err = RegistryError::Rebuild {
            name: "a".to_string(),
            source: Box::new(RegistryError::ArchiveEntryNotFound {
                path: PathBuf::from("a.html"),
            }),
        };
        let display = err.to_string();
        assert!(display.contains("rebuild"));
        assert!(display.contains("a.html"));
    }
}
