//! Custom functions attached to compiled template sets.
//!
//! A [`FuncMap`] maps identifiers to callables. Every entry is exposed to
//! templates twice: as a global function (`{{ upper(name) }}`) and as a filter
//! (`{{ name | upper }}`), where the filtered value becomes the first argument.
//!
//! A registry holds one shared map and each set may carry its own. When a set
//! is compiled, the shared map is attached first and the per-set map second,
//! so a per-set entry replaces a shared entry with the same identifier for
//! that set only.
//!
//! ```rust
//! use templatebox::FuncMap;
//!
//! let funcs = FuncMap::new()
//!     .with("upper", |s: String| s.to_uppercase())
//!     .with("repeat", |s: String, n: usize| s.repeat(n));
//!
//! assert!(funcs.contains("upper"));
//! assert_eq!(funcs.len(), 2);
//! ```

use std::collections::BTreeMap;

use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult, Rest};
use minijinja::{Environment, Error, State, Value};

/// A table of named callables made available to templates.
///
/// Cloning is cheap: callables are reference counted.
#[derive(Debug, Clone, Default)]
pub struct FuncMap {
    funcs: BTreeMap<String, Value>,
}

impl FuncMap {
    /// Creates an empty function table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a function.
    ///
    /// Any closure or function MiniJinja accepts as a template function can be
    /// registered, including ones that take `&State` first or return
    /// `Result<_, minijinja::Error>`.
    pub fn insert<F, Rv, Args>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.funcs.insert(name.into(), Value::from_function(f));
        self
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with<F, Rv, Args>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.insert(name, f);
        self
    }

    /// Adds or replaces an entry with an already callable value, such as one
    /// built with [`Value::from_function`] or a callable object.
    pub fn insert_value(&mut self, name: impl Into<String>, callable: Value) -> &mut Self {
        self.funcs.insert(name.into(), callable);
        self
    }

    /// Removes a function, returning its callable if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.funcs.remove(name)
    }

    /// Copies every entry of `other` into this table; `other` wins on collision.
    pub fn merge(&mut self, other: &FuncMap) {
        for (name, callable) in &other.funcs {
            self.funcs.insert(name.clone(), callable.clone());
        }
    }

    /// Returns the callable registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Iterates over the identifiers in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.funcs.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    /// Registers every entry with `env` as both a global function and a filter.
    /// Entries already present in `env` under the same name are replaced.
    pub(crate) fn attach(&self, env: &mut Environment<'static>) {
        for (name, callable) in &self.funcs {
            env.add_global(name.clone(), callable.clone());

            let callable = callable.clone();
            env.add_filter(
                name.clone(),
                move |state: &State, args: Rest<Value>| -> Result<Value, Error> {
                    callable.call(state, &args.0)
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(env: &Environment<'static>, source: &str) -> String {
        env.render_str(source, minijinja::context! { name => "ada" })
            .unwrap()
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut funcs = FuncMap::new();
        funcs.insert("upper", |s: String| s.to_uppercase());

        assert!(funcs.contains("upper"));
        assert!(funcs.get("upper").is_some());
        assert!(!funcs.contains("lower"));
        assert_eq!(funcs.names().collect::<Vec<_>>(), vec!["upper"]);
    }

    #[test]
    fn test_attach_exposes_function_and_filter() {
        let funcs = FuncMap::new().with("upper", |s: String| s.to_uppercase());
        let mut env = Environment::new();
        funcs.attach(&mut env);

        assert_eq!(render(&env, "{{ upper(name) }}"), "ADA");
        assert_eq!(render(&env, "{{ name | upper }}"), "ADA");
    }

    #[test]
    fn test_filter_passes_extra_arguments() {
        let funcs = FuncMap::new().with("repeat", |s: String, n: usize| s.repeat(n));
        let mut env = Environment::new();
        funcs.attach(&mut env);

        assert_eq!(render(&env, "{{ name | repeat(2) }}"), "adaada");
    }

    #[test]
    fn test_later_attach_overrides() {
        let shared = FuncMap::new().with("greet", |s: String| format!("hello {s}"));
        let local = FuncMap::new().with("greet", |s: String| format!("hi {s}"));

        let mut env = Environment::new();
        shared.attach(&mut env);
        local.attach(&mut env);

        assert_eq!(render(&env, "{{ greet(name) }}"), "hi ada");
    }

    #[test]
    fn test_merge_and_remove() {
        let mut funcs = FuncMap::new().with("a", || "a");
        let other = FuncMap::new().with("b", || "b");
        funcs.merge(&other);
        assert_eq!(funcs.len(), 2);

        assert!(funcs.remove("a").is_some());
        assert!(funcs.remove("a").is_none());
        assert_eq!(funcs.len(), 1);
    }

    #[test]
    fn test_empty() {
        let funcs = FuncMap::default();
        assert!(funcs.is_empty());
        assert_eq!(funcs.len(), 0);
    }
}
