use crate::classifier::{self, Classification};
use crate::env::Environment;
use crate::reaper::{self, Reaper};
use crate::tokenizer::{self, ParsedCommand};
use crate::{builtin, external};
use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;
use std::path::PathBuf;

/// Prompt printed before every line of input.
const PROMPT: &str = "shell:~$ ";

/// What the loop should do after dispatching one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Return to the prompt; every path except `exit` ends here.
    Continue,
    /// The explicit exit command was issued.
    Exit,
}

/// The interactive command interpreter.
///
/// Drives the read-classify-dispatch cycle: each input line is tokenized,
/// classified as builtin / external / unknown, and executed either in-process,
/// in the foreground (blocking wait) or as a detached background child handed
/// to the [`Reaper`]. No command failure ever ends the loop; only `exit` (or
/// end of input) does.
///
/// Example
/// ```
/// use minishell::{Interpreter, Outcome};
/// let log = std::env::temp_dir().join("minishell_doc_log");
/// let mut sh = Interpreter::with_termination_log(log).unwrap();
/// assert_eq!(sh.dispatch_line("export GREETING=hi"), Outcome::Continue);
/// ```
pub struct Interpreter {
    env: Environment,
    reaper: Reaper,
}

impl Interpreter {
    /// Create an interpreter logging child terminations to the default path.
    pub fn new() -> Result<Self> {
        Self::with_termination_log(reaper::default_log_path())
    }

    /// Create an interpreter with an explicit termination-log location.
    pub fn with_termination_log(log_path: PathBuf) -> Result<Self> {
        Ok(Self {
            env: Environment::new(),
            reaper: Reaper::spawn(log_path)?,
        })
    }

    /// Move into `$HOME` (or `/` when unset) before the first prompt.
    ///
    /// Failure to change directory is a warning, never fatal.
    pub fn bootstrap(&mut self) {
        let home = self.env.get_var("HOME").unwrap_or_else(|| "/".to_string());
        match std::env::set_current_dir(&home) {
            Ok(()) => self.env.current_dir = PathBuf::from(home),
            Err(err) => tracing::warn!(%home, %err, "could not enter home directory"),
        }
    }

    /// The Read-Eval-Print Loop.
    ///
    /// Reads lines with a rustyline editor (history included), dispatching
    /// each one. `Ctrl-C` discards the current line and re-prompts; `Ctrl-D`
    /// (end of input) leaves the loop like `exit` does.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    rl.add_history_entry(line.as_str())?;
                    if self.dispatch_line(&line) == Outcome::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("minishell: {err}");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Dispatch one raw input line, writing command output to stdout.
    pub fn dispatch_line(&mut self, line: &str) -> Outcome {
        let mut stdout = std::io::stdout();
        let outcome = self.dispatch_line_to(line, &mut stdout);
        let _ = stdout.flush();
        outcome
    }

    /// Dispatch one raw input line against an arbitrary output stream.
    ///
    /// This is the whole state machine of the loop: blank input re-prompts,
    /// `exit` is terminal, everything else runs and returns to the prompt
    /// whether it succeeded or not. Errors are reported to stderr.
    pub fn dispatch_line_to(&mut self, line: &str, stdout: &mut dyn Write) -> Outcome {
        let Some(cmd) = tokenizer::parse_line(line) else {
            return Outcome::Continue;
        };

        match classifier::classify(&self.env, &cmd.name) {
            Classification::Exit => Outcome::Exit,
            Classification::Builtin => {
                if let Err(err) = builtin::execute(&cmd, stdout, &mut self.env) {
                    eprintln!("{err}");
                }
                Outcome::Continue
            }
            Classification::External => {
                self.run_external(&cmd, stdout);
                Outcome::Continue
            }
            Classification::Unknown => {
                eprintln!("{}: command not found", cmd.name);
                Outcome::Continue
            }
        }
    }

    fn run_external(&mut self, cmd: &ParsedCommand, stdout: &mut dyn Write) {
        match external::launch(&self.env, cmd, &self.reaper, stdout) {
            Ok(code) => {
                tracing::trace!(name = %cmd.name, code, background = cmd.background, "dispatched");
            }
            Err(err) => eprintln!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

    fn test_interpreter(tag: &str) -> Interpreter {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let log = std::env::temp_dir().join(format!(
            "interp_test_{}_{}_{}",
            std::process::id(),
            tag,
            nanos
        ));
        Interpreter::with_termination_log(log).unwrap()
    }

    #[test]
    fn test_blank_lines_re_prompt_without_dispatch() {
        let mut sh = test_interpreter("blank");
        let mut out = Vec::new();
        assert_eq!(sh.dispatch_line_to("", &mut out), Outcome::Continue);
        assert_eq!(sh.dispatch_line_to("   \t ", &mut out), Outcome::Continue);
        assert_eq!(sh.dispatch_line_to("&", &mut out), Outcome::Continue);
        assert!(out.is_empty());
    }

    #[test]
    fn test_exit_is_terminal() {
        let mut sh = test_interpreter("exit");
        let mut out = Vec::new();
        assert_eq!(sh.dispatch_line_to("exit", &mut out), Outcome::Exit);
    }

    #[test]
    fn test_export_then_echo() {
        let mut sh = test_interpreter("export");
        let mut out = Vec::new();
        assert_eq!(
            sh.dispatch_line_to("export FOO=bar", &mut out),
            Outcome::Continue
        );
        assert_eq!(sh.dispatch_line_to("echo $FOO", &mut out), Outcome::Continue);
        assert_eq!(String::from_utf8(out).unwrap(), "bar\n");
    }

    #[test]
    fn test_echo_unset_variable_prints_empty_line() {
        let mut sh = test_interpreter("unset");
        let mut out = Vec::new();
        sh.dispatch_line_to("echo $UNSET_VAR_424242", &mut out);
        assert_eq!(String::from_utf8(out).unwrap(), "\n");
    }

    #[test]
    fn test_unknown_command_continues() {
        let mut sh = test_interpreter("unknown");
        let mut out = Vec::new();
        assert_eq!(
            sh.dispatch_line_to("no_such_command_31337", &mut out),
            Outcome::Continue
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_malformed_export_continues() {
        let mut sh = test_interpreter("badexport");
        let mut out = Vec::new();
        assert_eq!(
            sh.dispatch_line_to("export NOEQUALS", &mut out),
            Outcome::Continue
        );
        let mut echo_out = Vec::new();
        sh.dispatch_line_to("echo $NOEQUALS", &mut echo_out);
        assert_eq!(String::from_utf8(echo_out).unwrap(), "\n");
    }

    #[test]
    #[cfg(unix)]
    fn test_foreground_external_blocks_until_exit() {
        let mut sh = test_interpreter("fg");
        let start = Instant::now();
        let mut out = Vec::new();
        assert_eq!(sh.dispatch_line_to("sleep 1", &mut out), Outcome::Continue);
        assert!(start.elapsed() >= Duration::from_millis(900));
    }

    #[test]
    #[cfg(unix)]
    fn test_background_external_returns_immediately() {
        let mut sh = test_interpreter("bg");
        let start = Instant::now();
        let mut out = Vec::new();
        assert_eq!(sh.dispatch_line_to("sleep 5 &", &mut out), Outcome::Continue);
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(
            String::from_utf8(out)
                .unwrap()
                .starts_with("Started background process: ")
        );
    }
}
