use crate::env::Environment;
use crate::tokenizer::ParsedCommand;
use crate::ExitCode;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env as stdenv;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
/// directly in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command against the provided output stream and environment.
    ///
    /// Return value follows shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

/// Execute a command already classified as a builtin.
///
/// Argument parsing failures (including `--help`) surface through argh's
/// [`EarlyExit`] and print the generated usage text instead of running the
/// command. Execution errors propagate to the caller, which reports them and
/// keeps the loop alive.
pub(crate) fn execute(
    cmd: &ParsedCommand,
    stdout: &mut dyn Write,
    env: &mut Environment,
) -> Result<ExitCode> {
    let args: Vec<&str> = cmd.args[1..].iter().map(String::as_str).collect();
    match cmd.name.as_str() {
        "cd" => run::<Cd>(&args, stdout, env),
        // echo prints every token literally, dash-prefixed ones included, so
        // it must not go through option parsing.
        "echo" => Echo {
            args: cmd.args[1..].to_vec(),
        }
        .execute(stdout, env),
        "export" => run::<Export>(&args, stdout, env),
        other => Err(anyhow::anyhow!("not a builtin: {}", other)),
    }
}

fn run<T: BuiltinCommand>(
    args: &[&str],
    stdout: &mut dyn Write,
    env: &mut Environment,
) -> Result<ExitCode> {
    match T::from_args(&[T::name()], args) {
        Ok(cmd) => cmd.execute(stdout, env),
        Err(EarlyExit { output, status }) => {
            writeln!(stdout, "{}", output.trim_end())?;
            Ok(if status.is_err() { 1 } else { 0 })
        }
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => {
                if let Some(home) = env.get_var("HOME") {
                    PathBuf::from(home)
                } else {
                    return Err(anyhow::anyhow!("cd: no target and HOME not set"));
                }
            }
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: can't canonicalize {}", new_dir.display()))?;

        stdenv::set_current_dir(&canonical)
            .with_context(|| format!("cd: can't chdir to {}", canonical.display()))?;
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// write the arguments to standard output, separated by spaces and terminated
/// by a newline. An argument starting with `$` is replaced by the value of the
/// named environment variable, or by the empty string when it is unset.
pub struct Echo {
    #[argh(positional, greedy)]
    /// values to print; `$VAR` arguments are substituted from the environment.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let expanded: Vec<String> = self
            .args
            .iter()
            .map(|arg| match arg.strip_prefix('$') {
                Some(var) => env.get_var(var).unwrap_or_default(),
                None => arg.clone(),
            })
            .collect();
        writeln!(stdout, "{}", expanded.join(" "))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// bind an environment variable for the shell and every subsequently spawned
/// command. The single argument must have the form VAR=value.
pub struct Export {
    #[argh(positional)]
    /// assignment of the form VAR=value.
    pub assignment: Option<String>,
}

impl BuiltinCommand for Export {
    fn name() -> &'static str {
        "export"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let usage = || anyhow::anyhow!("export: usage: export VAR=value");

        let assignment = self.assignment.ok_or_else(usage)?;
        if assignment.matches('=').count() != 1 {
            return Err(usage());
        }
        let (name, value) = assignment.split_once('=').ok_or_else(usage)?;
        if name.is_empty() {
            return Err(usage());
        }

        env.set_var(name, value);
        Ok(0)
    }
}
