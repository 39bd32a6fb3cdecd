use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable, interpreter-level view of the process environment.
///
/// This is the single shared context threaded through classification, builtin
/// execution and external launching:
/// - `vars`: variable bindings visible to builtins (`echo $VAR`) and exported
///   to every spawned child.
/// - `current_dir`: the working directory commands run in, mutated only by `cd`.
///
/// There is one control thread, so mutation is naturally serialized with
/// respect to every read site.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state into a new `Environment`.
    ///
    /// Copies variables from `std::env::vars()` and initializes `current_dir`
    /// from `std::env::current_dir()`.
    pub fn new() -> Self {
        let mut vars = HashMap::new();
        for (k, v) in stdenv::vars() {
            vars.insert(k, v);
        }
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable in `self.vars`.
    ///
    /// Bindings made here are picked up by `echo $VAR` and by the `envs()` of
    /// every subsequently spawned child.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
