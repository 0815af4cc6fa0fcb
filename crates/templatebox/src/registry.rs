//! The template registry.
//!
//! [`Registry`] holds compiled template sets under string keys and renders
//! them by name. It is built once at startup and then shared between threads:
//! every method takes `&self`.
//!
//! # Backing store
//!
//! Template files come from one of two places:
//!
//! | Constructor | Files read from | Debug recompilation |
//! |-------------|-----------------|---------------------|
//! | [`Registry::from_directory`] | the live filesystem | yes, when enabled |
//! | [`Registry::from_archive`] | an immutable [`Archive`] | never |
//!
//! File paths in a [`FileSet`] are joined with the registry's root directory
//! unless the root is empty, in which case they are used as given.
//!
//! # Debug mode
//!
//! With [`Config::debug`] set on a directory-backed registry, the registry
//! remembers the [`FileSet`] behind every file-sourced name and re-parses it
//! before each render, so on-disk edits are visible immediately. There is no
//! watcher and no staleness check: every render re-reads every file of the
//! set. Literal sets are never recompiled.
//!
//! # Locking
//!
//! The shared function table, the compiled map and the debug source map each
//! sit behind their own read/write lock. Compilation, including file reads,
//! happens before any lock is taken; only the final insert holds a write lock,
//! so registrations under different names never wait on each other's parsing.
//!
//! When both maps are touched, the source map is locked first and the compiled
//! map second. Every recorded file source carries the generation of the
//! registration that stored it; a debug recompilation only lands if that
//! generation is still current, so a render never reverts a registration that
//! finished while it was compiling.
//!
//! # Failure semantics
//!
//! A failed registration leaves the map untouched: the name keeps its previous
//! compiled set, or stays unregistered. A failed render may already have
//! written part of the document to the sink; that output is not rolled back.
//!
//! # Example
//!
//! ```rust
//! use templatebox::{Archive, FileSet, LiteralSet, Registry};
//!
//! let archive = Archive::from_entries(&[
//!     ("templates/layout.html", "<body>{% block content %}{% endblock %}</body>"),
//!     ("templates/hello.html", "{% block content %}Hello, {{ name }}!{% endblock %}"),
//! ]);
//!
//! let registry = Registry::from_archive(Some(archive), "templates", None).unwrap();
//! registry
//!     .add_file_set("hello", FileSet::new(["layout.html", "hello.html"]))
//!     .unwrap();
//! registry
//!     .add_literal_set("plain", LiteralSet::new(["Bye, {{ name }}."]))
//!     .unwrap();
//!
//! let mut out = Vec::new();
//! registry
//!     .render(&mut out, "hello", serde_json::json!({ "name": "World" }))
//!     .unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "<body>Hello, World!</body>");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::archive::Archive;
use crate::compile::{compile_files, compile_literals, CompiledSet};
use crate::config::Config;
use crate::error::RegistryError;
use crate::functions::FuncMap;
use crate::source::{FileSet, LiteralSet};

/// Where template files are read from.
enum Backing {
    /// Live filesystem, read on every compile.
    Directory,
    /// Immutable in-memory archive.
    Archive(Arc<Archive>),
}

/// A file source recorded for debug recompilation.
#[derive(Debug, Clone)]
struct TrackedSource {
    set: FileSet,
    generation: u64,
}

/// A thread-safe registry of named, compiled template sets.
pub struct Registry {
    config: Config,
    root_dir: PathBuf,
    backing: Backing,
    shared: RwLock<FuncMap>,
    compiled: RwLock<HashMap<String, Arc<CompiledSet>>>,
    /// File sources kept for recompilation. `Some` only in debug mode on a
    /// directory-backed registry.
    sources: Option<RwLock<HashMap<String, TrackedSource>>>,
    /// Source of registration generations.
    generation: AtomicU64,
}

impl Registry {
    /// Creates a registry that reads template files from `archive`.
    ///
    /// `root_dir` is the directory inside the archive that file paths are
    /// relative to; pass `""` if set paths are full archive paths. A missing
    /// `config` falls back to [`Config::default`]. Debug mode is accepted but
    /// has no effect, since an archive cannot change.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MissingArchive`] if `archive` is `None`.
    pub fn from_archive(
        archive: Option<Archive>,
        root_dir: impl Into<PathBuf>,
        config: Option<Config>,
    ) -> Result<Self, RegistryError> {
        let archive = archive.ok_or(RegistryError::MissingArchive)?;
        let config = config.unwrap_or_default();
        let root_dir = root_dir.into();

        debug!(
            root_dir = %root_dir.display(),
            files = archive.len(),
            debug = config.debug,
            "created archive-backed template registry"
        );

        Ok(Self::with_backing(
            Backing::Archive(Arc::new(archive)),
            root_dir,
            config,
        ))
    }

    /// Creates a registry that reads template files from the directory
    /// `root_dir` on the live filesystem.
    ///
    /// An empty `root_dir` is accepted without a check; set paths are then
    /// used as given. A missing `config` falls back to [`Config::default`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DirectoryNotFound`] if `root_dir` does not
    /// exist or is not a directory, and [`RegistryError::Stat`] if it cannot
    /// be inspected.
    pub fn from_directory(
        root_dir: impl Into<PathBuf>,
        config: Option<Config>,
    ) -> Result<Self, RegistryError> {
        let root_dir = root_dir.into();
        let config = config.unwrap_or_default();

        if !root_dir.as_os_str().is_empty() {
            match fs::metadata(&root_dir) {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => return Err(RegistryError::DirectoryNotFound { path: root_dir }),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    return Err(RegistryError::DirectoryNotFound { path: root_dir })
                }
                Err(source) => {
                    return Err(RegistryError::Stat {
                        path: root_dir,
                        source,
                    })
                }
            }
        }

        debug!(
            root_dir = %root_dir.display(),
            debug = config.debug,
            "created directory-backed template registry"
        );

        Ok(Self::with_backing(Backing::Directory, root_dir, config))
    }

    fn with_backing(backing: Backing, root_dir: PathBuf, config: Config) -> Self {
        let sources = match backing {
            Backing::Directory if config.debug => Some(RwLock::new(HashMap::new())),
            _ => None,
        };

        Self {
            config,
            root_dir,
            backing,
            shared: RwLock::new(FuncMap::new()),
            compiled: RwLock::new(HashMap::new()),
            sources,
            generation: AtomicU64::new(0),
        }
    }

    /// Returns the root directory set paths are joined with.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns true if template files come from an archive.
    pub fn is_archive_backed(&self) -> bool {
        matches!(self.backing, Backing::Archive(_))
    }

    /// Replaces the shared function table.
    ///
    /// Sets compiled before the call keep the table they were compiled with
    /// until they are registered again or recompiled in debug mode.
    pub fn set_shared_functions(&self, funcs: FuncMap) {
        debug!(functions = funcs.len(), "replaced shared function table");
        *self.shared.write() = funcs;
    }

    /// Returns a copy of the shared function table.
    pub fn shared_functions(&self) -> FuncMap {
        self.shared.read().clone()
    }

    /// Compiles a file set and stores it under `name`, replacing any set
    /// previously registered under that name.
    ///
    /// The set's files are parsed as one chain: the first file is the layout
    /// and each later file fills in the blocks declared before it.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NoSources`] if the set lists no files
    /// - [`RegistryError::Read`] or [`RegistryError::ArchiveEntryNotFound`] if a
    ///   file cannot be loaded
    /// - [`RegistryError::Compile`] if a file fails to parse
    ///
    /// On error nothing is stored.
    pub fn add_file_set(&self, name: impl Into<String>, set: FileSet) -> Result<(), RegistryError> {
        let name = name.into();
        let compiled = self.compile_file_set(&name, &set)?;

        debug!(
            template = %name,
            root = compiled.name(),
            files = set.files.len(),
            "registered file set"
        );

        self.store(name, Arc::new(compiled), Some(set));
        Ok(())
    }

    /// Registers every `(name, set)` pair in iteration order.
    ///
    /// Registration stops at the first failure, which is returned wrapped in
    /// [`RegistryError::Batch`]. Sets registered before the failure stay
    /// registered; there is no rollback. Pass an ordered collection such as a
    /// `BTreeMap` or `Vec` if the order matters.
    pub fn add_file_sets<I, K>(&self, sets: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = (K, FileSet)>,
        K: Into<String>,
    {
        for (name, set) in sets {
            let name = name.into();
            if let Err(err) = self.add_file_set(name.clone(), set) {
                return Err(RegistryError::Batch {
                    name,
                    source: Box::new(err),
                });
            }
        }
        Ok(())
    }

    /// Compiles a literal set and stores it under `name`, replacing any set
    /// previously registered under that name.
    ///
    /// Strings are parsed in order into one chain, so later strings can define
    /// blocks that earlier ones declare. Literal sets never take part in debug
    /// recompilation; registering one drops any file source remembered for
    /// `name`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NoSources`] if the set has no strings
    /// - [`RegistryError::Parse`] naming the index and text of the first
    ///   string that fails to parse
    ///
    /// On error nothing is stored.
    pub fn add_literal_set(
        &self,
        name: impl Into<String>,
        set: LiteralSet,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let shared = self.shared_functions();
        let compiled = compile_literals(&name, &set, &shared)?;

        debug!(template = %name, sources = set.sources.len(), "registered literal set");

        self.store(name, Arc::new(compiled), None);
        Ok(())
    }

    /// Renders the set registered under `name` into `sink`.
    ///
    /// `data` is handed to the templates as-is; no schema is checked, so a
    /// mismatch between data and template only shows up as a render error.
    ///
    /// In debug mode on a directory-backed registry, a file-sourced set is
    /// recompiled from disk first and the fresh set replaces the stored one.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Rebuild`] if debug recompilation fails; the
    ///   previously compiled set stays registered
    /// - [`RegistryError::NotFound`] if nothing is registered under `name`;
    ///   nothing is written to `sink`
    /// - [`RegistryError::Render`] if execution fails; output written before
    ///   the failure remains in `sink`
    pub fn render<W, S>(&self, sink: W, name: &str, data: S) -> Result<(), RegistryError>
    where
        W: io::Write,
        S: Serialize,
    {
        self.refresh_before_render(name)?;

        let compiled = self
            .get(name)
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })?;

        compiled
            .render(data, sink)
            .map_err(|source| RegistryError::Render {
                name: name.to_string(),
                source,
            })?;

        debug!(template = name, "rendered template");
        Ok(())
    }

    /// Renders the set registered under `name` into a new string.
    pub fn render_to_string<S>(&self, name: &str, data: S) -> Result<String, RegistryError>
    where
        S: Serialize,
    {
        let mut out = Vec::new();
        self.render(&mut out, name, data)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Returns the compiled set registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<CompiledSet>> {
        self.compiled.read().get(name).cloned()
    }

    /// Returns true if a set is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.compiled.read().contains_key(name)
    }

    /// Returns all registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.compiled.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.compiled.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.read().is_empty()
    }

    /// Stores a compiled set. `source` replaces the recorded file source for
    /// `name`; `None` drops it.
    fn store(&self, name: String, compiled: Arc<CompiledSet>, source: Option<FileSet>) {
        let mut sources = self.sources.as_ref().map(|sources| sources.write());
        if let Some(sources) = sources.as_mut() {
            match source {
                Some(set) => {
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                    sources.insert(name.clone(), TrackedSource { set, generation });
                }
                None => {
                    sources.remove(&name);
                }
            }
        }
        self.compiled.write().insert(name, compiled);
    }

    fn refresh_before_render(&self, name: &str) -> Result<(), RegistryError> {
        let Some(sources) = &self.sources else {
            return Ok(());
        };

        let tracked = sources.read().get(name).cloned();
        let Some(tracked) = tracked else {
            return Ok(());
        };

        let is_current = |current: &HashMap<String, TrackedSource>| {
            current
                .get(name)
                .is_some_and(|t| t.generation == tracked.generation)
        };

        let compiled = match self.compile_file_set(name, &tracked.set) {
            Ok(compiled) => compiled,
            // A newer registration replaced the set while it was compiling.
            Err(_) if !is_current(&*sources.read()) => return Ok(()),
            Err(source) => {
                return Err(RegistryError::Rebuild {
                    name: name.to_string(),
                    source: Box::new(source),
                })
            }
        };

        let current = sources.read();
        if is_current(&*current) {
            self.compiled
                .write()
                .insert(name.to_string(), Arc::new(compiled));
            debug!(template = name, "recompiled file set before render");
        } else {
            debug!(template = name, "discarded recompilation superseded by a newer registration");
        }
        Ok(())
    }

    fn compile_file_set(&self, name: &str, set: &FileSet) -> Result<CompiledSet, RegistryError> {
        let shared = self.shared_functions();
        compile_files(name, set, &shared, |path| self.load(path))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if self.root_dir.as_os_str().is_empty() {
            path.to_path_buf()
        } else {
            self.root_dir.join(path)
        }
    }

    fn load(&self, path: &Path) -> Result<String, RegistryError> {
        let path = self.resolve(path);
        tracing::trace!(path = %path.display(), "loading template file");

        match &self.backing {
            Backing::Directory => {
                fs::read_to_string(&path).map_err(|source| RegistryError::Read { path, source })
            }
            Backing::Archive(archive) => archive
                .get(&path)
                .map(str::to_owned)
                .ok_or(RegistryError::ArchiveEntryNotFound { path }),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("root_dir", &self.root_dir)
            .field("config", &self.config)
            .field("archive_backed", &self.is_archive_backed())
            .field("templates", &self.names())
            .finish_non_exhaustive()
    }
}
