//! # Templatebox - Named HTML Template Sets
//!
//! `templatebox` keeps a registry of compiled HTML template sets and renders
//! them by name. A set is an ordered list of sources, read from files or given
//! as strings, that compile together into one renderable unit: the first source
//! is the layout and every later source fills in the blocks declared before it.
//!
//! Templates are written in MiniJinja syntax. Output is HTML-escaped, and
//! printing a value that the render data does not provide is an error, while
//! `{% if %}` treats a missing value as false.
//!
//! ## Core Concepts
//!
//! - [`Registry`]: thread-safe map from names to compiled sets
//! - [`FileSet`] / [`LiteralSet`]: ordered sources for one set
//! - [`FuncMap`]: custom functions, shared across the registry or per set
//! - [`Archive`]: immutable in-memory file tree for embedded templates
//! - [`Config`]: registry options (debug recompilation)
//!
//! ## Quick Start
//!
//! ```rust
//! use templatebox::{Archive, FileSet, FuncMap, Registry};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Page {
//!     title: String,
//! }
//!
//! let archive = Archive::from_entries(&[
//!     ("views/layout.html", "<h1>{% block title %}{% endblock %}</h1>"),
//!     ("views/page.html", "{% block title %}{{ title | shout }}{% endblock %}"),
//! ]);
//!
//! let registry = Registry::from_archive(Some(archive), "views", None).unwrap();
//! registry.set_shared_functions(FuncMap::new().with("shout", |s: String| s.to_uppercase()));
//! registry
//!     .add_file_set("page", FileSet::new(["layout.html", "page.html"]))
//!     .unwrap();
//!
//! let html = registry
//!     .render_to_string("page", Page { title: "a & b".into() })
//!     .unwrap();
//! assert_eq!(html, "<h1>A &amp; B</h1>");
//! ```
//!
//! ## Development Mode
//!
//! A registry created with [`Registry::from_directory`] and
//! [`Config::debug`] enabled re-reads the files of a set before every render,
//! so template edits show up without a restart:
//!
//! ```rust,no_run
//! use templatebox::{Config, FileSet, Registry};
//!
//! let registry = Registry::from_directory(
//!     "templates",
//!     Some(Config::new().with_debug(true)),
//! )?;
//! registry.add_file_set("home", FileSet::new(["layout.html", "home.html"]))?;
//! registry.render(std::io::stdout(), "home", serde_json::json!({}))?;
//! # Ok::<(), templatebox::RegistryError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `include-dir`: build an [`Archive`] from an `include_dir::Dir` embedded
//!   at compile time.

mod archive;
mod compile;
mod config;
mod error;
mod functions;
mod registry;
mod source;

pub use archive::Archive;
pub use compile::CompiledSet;
pub use config::Config;
pub use error::RegistryError;
pub use functions::FuncMap;
pub use registry::Registry;
pub use source::{FileSet, LiteralSet};

// Re-exported so callers can name callable values and errors in custom
// functions without a direct dependency.
pub use minijinja::{Error as TemplateError, State, Value};
