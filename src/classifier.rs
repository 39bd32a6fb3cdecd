//! Command classification: decide how a command name should be dispatched.

use crate::env::Environment;
use std::path::{Path, PathBuf};

/// Dispatch category of a command name.
///
/// Derived purely from the name and the current `PATH` binding; carries no
/// process resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The explicit `exit` command — the only way to end the loop.
    Exit,
    /// One of the in-process builtins: `cd`, `echo`, `export`.
    Builtin,
    /// An executable reachable through `PATH` (or named by path).
    External,
    /// Nothing matched; dispatch should report and re-prompt.
    Unknown,
}

/// Classify `name` against the builtin table and the `PATH` of `env`.
pub fn classify(env: &Environment, name: &str) -> Classification {
    match name {
        "exit" => Classification::Exit,
        "cd" | "echo" | "export" => Classification::Builtin,
        _ => {
            if resolve_external(env, name).is_some() {
                Classification::External
            } else {
                tracing::debug!(name, "no executable match on PATH");
                Classification::Unknown
            }
        }
    }
}

/// Resolve a command name the way `execvp` would.
///
/// A name containing a path separator is tested directly as a path. A bare
/// name is searched through the directories of the `PATH` variable in order,
/// returning the first entry holding an executable regular file. Empty `PATH`
/// entries are skipped rather than treated as the current directory.
///
/// A missing or empty `PATH` resolves nothing.
///
/// The launcher re-resolves by name at spawn time, so a match here can go
/// stale before exec; that race is tolerated and surfaces as a reported
/// spawn failure.
pub fn resolve_external(env: &Environment, name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let search_paths = env.get_var("PATH")?;
    for dir in search_paths.split(':').filter(|d| !d.is_empty()) {
        let path = Path::new(dir).join(name);
        if is_executable(&path) {
            return Some(path);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
