//! Compilation of source sets into MiniJinja environments.
//!
//! Every set gets its own [`Environment`]. Its sources are chained: source 0
//! is added unchanged, and each later source is added as a child of the one
//! before it, so `{% block %}` definitions further down the list fill or
//! override the blocks declared by the layout. The last source in the chain is
//! the entry template that a render executes.
//!
//! Environment settings shared by all sets:
//!
//! - HTML auto-escaping regardless of template name
//! - trailing newlines are kept, so output matches source byte for byte
//! - semi-strict undefined handling: printing or indexing an unresolvable
//!   variable fails the render, while `{% if %}` treats it as false

use std::fmt;
use std::io;
use std::path::Path;

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;

use crate::error::RegistryError;
use crate::functions::FuncMap;
use crate::source::{base_name, FileSet, LiteralSet};

/// A compiled template set, ready to render.
///
/// Compiled sets are immutable. Re-registering a name builds a new one and
/// swaps it in; an existing `CompiledSet` never changes.
pub struct CompiledSet {
    name: String,
    entry: String,
    templates: Vec<String>,
    env: Environment<'static>,
}

impl CompiledSet {
    /// Construction-time name: the first file's base name for file sets, the
    /// registry key for literal sets. Used for diagnostics only.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the template a render executes.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Names of the chained templates, from the layout to the entry.
    pub fn template_names(&self) -> &[String] {
        &self.templates
    }

    /// Executes the entry template, streaming output into `sink`.
    pub(crate) fn render<S, W>(&self, data: S, sink: W) -> Result<(), minijinja::Error>
    where
        S: Serialize,
        W: io::Write,
    {
        let template = self.env.get_template(&self.entry)?;
        template.render_to_write(data, sink)?;
        Ok(())
    }
}

impl fmt::Debug for CompiledSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSet")
            .field("name", &self.name)
            .field("entry", &self.entry)
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}

/// Compiles a file set. `load` receives each path exactly as listed in the
/// set and returns the file's content.
///
/// The first file is chained under its base name. Every later file is chained
/// as `"{base}#{index}"` and also added unchanged under its base name, so other
/// files of the set can `{% include %}` or `{% import %}` it. A base name that
/// repeats the first file's stays with the first file; among later files the
/// last one wins.
pub(crate) fn compile_files<L>(
    name: &str,
    set: &FileSet,
    shared: &FuncMap,
    mut load: L,
) -> Result<CompiledSet, RegistryError>
where
    L: FnMut(&Path) -> Result<String, RegistryError>,
{
    let root = set.root_name().ok_or_else(|| RegistryError::NoSources {
        name: name.to_string(),
    })?;

    let mut builder = SetBuilder::new(root.clone(), shared, set.funcs.as_ref());
    for (index, path) in set.files.iter().enumerate() {
        let source = load(path)?;
        let base = base_name(path);
        let compile_err = |source: minijinja::Error| RegistryError::Compile {
            name: name.to_string(),
            file: path.display().to_string(),
            source,
        };

        if index == 0 {
            builder.push(base, source).map_err(compile_err)?;
            continue;
        }

        let standalone = (base != root).then(|| source.clone());
        builder
            .push(format!("{base}#{index}"), source)
            .map_err(compile_err)?;
        if let Some(standalone) = standalone {
            builder.add_standalone(base, standalone).map_err(compile_err)?;
        }
    }

    Ok(builder.finish())
}

/// Compiles a literal set. Source 0 is registered under `name`, source `i`
/// under `"{name}#{i}"`.
pub(crate) fn compile_literals(
    name: &str,
    set: &LiteralSet,
    shared: &FuncMap,
) -> Result<CompiledSet, RegistryError> {
    if set.is_empty() {
        return Err(RegistryError::NoSources {
            name: name.to_string(),
        });
    }

    let mut builder = SetBuilder::new(name.to_string(), shared, set.funcs.as_ref());
    for (index, source) in set.sources.iter().enumerate() {
        let template_name = match index {
            0 => name.to_string(),
            _ => format!("{name}#{index}"),
        };
        builder
            .push(template_name, source.clone())
            .map_err(|err| RegistryError::Parse {
                name: name.to_string(),
                index,
                content: source.clone(),
                source: err,
            })?;
    }

    Ok(builder.finish())
}

struct SetBuilder {
    name: String,
    templates: Vec<String>,
    env: Environment<'static>,
}

impl SetBuilder {
    fn new(name: String, shared: &FuncMap, local: Option<&FuncMap>) -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(UndefinedBehavior::SemiStrict);

        // Per-set functions go last so they replace shared ones.
        shared.attach(&mut env);
        if let Some(local) = local {
            local.attach(&mut env);
        }

        Self {
            name,
            templates: Vec::new(),
            env,
        }
    }

    /// Parses the next source of the chain. Syntax errors surface here;
    /// references to other templates are resolved at render time.
    fn push(&mut self, template_name: String, source: String) -> Result<(), minijinja::Error> {
        // The extends tag is prepended on the same line so reported line
        // numbers still match the author's source.
        let source = match self.templates.last() {
            Some(parent) => format!("{{% extends {} %}}{}", quote(parent), source),
            None => source,
        };

        self.env.add_template_owned(template_name.clone(), source)?;
        self.templates.push(template_name);
        Ok(())
    }

    /// Adds a source outside the chain, for includes and imports only.
    fn add_standalone(&mut self, template_name: String, source: String) -> Result<(), minijinja::Error> {
        self.env.add_template_owned(template_name, source)
    }

    fn finish(self) -> CompiledSet {
        let entry = self
            .templates
            .last()
            .cloned()
            .unwrap_or_else(|| self.name.clone());

        CompiledSet {
            name: self.name,
            entry,
            templates: self.templates,
            env: self.env,
        }
    }
}

/// Quotes a template name as a string literal for use inside a tag.
fn quote(name: &str) -> String {
    serde_json::Value::String(name.to_string()).to_string()
}
