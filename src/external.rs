use crate::env::Environment;
use crate::reaper::Reaper;
use crate::tokenizer::ParsedCommand;
use crate::ExitCode;
use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, ExitStatus};

/// Launch an external command.
///
/// The program is resolved by name through the platform's usual PATH search at
/// spawn time; a classification that has gone stale since (file removed,
/// permission dropped) simply surfaces here as a spawn error, which the caller
/// reports without ending the loop.
///
/// Foreground commands block until the child terminates and return its exit
/// code. Background commands are detached into their own session, their pid is
/// written to `stdout`, and the live [`Child`](std::process::Child) handle is
/// handed to the [`Reaper`], which owns the wait from then on.
pub(crate) fn launch(
    env: &Environment,
    cmd: &ParsedCommand,
    reaper: &Reaper,
    stdout: &mut dyn Write,
) -> Result<ExitCode> {
    let mut command = Command::new(&cmd.name);
    command
        .args(&cmd.args[1..])
        .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&env.current_dir);

    if cmd.background {
        detach_into_new_session(&mut command);
    }

    let mut child = command
        .spawn()
        .with_context(|| format!("error executing command: {}", cmd.name))?;

    if cmd.background {
        writeln!(stdout, "Started background process: {}", child.id())?;
        reaper.adopt(child);
        Ok(0)
    } else {
        let exit_status = child.wait()?;
        let code = match exit_status.code() {
            Some(x) => x,
            None => terminated_by_signal(exit_status),
        };
        if code != 0 {
            tracing::debug!(name = %cmd.name, code, "foreground command failed");
        }
        Ok(code)
    }
}

/// Arrange for the child to call `setsid()` between fork and exec, so a
/// background command is not tied to the interpreter's controlling terminal
/// or session.
#[cfg(unix)]
fn detach_into_new_session(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    unsafe {
        command.pre_exec(|| match nix::unistd::setsid() {
            Ok(_) => Ok(()),
            Err(errno) => Err(std::io::Error::from_raw_os_error(errno as i32)),
        });
    }
}

#[cfg(not(unix))]
fn detach_into_new_session(_command: &mut Command) {}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env as stdenv;
    use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

    fn test_env() -> Environment {
        Environment::new()
    }

    fn temp_log(tag: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        stdenv::temp_dir().join(format!(
            "external_test_log_{}_{}_{}",
            std::process::id(),
            tag,
            nanos
        ))
    }

    fn parsed(words: &[&str], background: bool) -> ParsedCommand {
        ParsedCommand {
            name: words[0].to_string(),
            args: words.iter().map(|w| w.to_string()).collect(),
            background,
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_foreground_returns_child_exit_code() {
        let env = test_env();
        let log = temp_log("fg");
        let reaper = Reaper::spawn(log.clone()).unwrap();

        let mut out = Vec::new();
        let code = launch(&env, &parsed(&["sh", "-c", "exit 7"], false), &reaper, &mut out).unwrap();
        assert_eq!(code, 7);
        assert!(out.is_empty());

        let _ = std::fs::remove_file(log);
    }

    #[test]
    #[cfg(unix)]
    fn test_foreground_success_is_zero() {
        let env = test_env();
        let log = temp_log("fg_ok");
        let reaper = Reaper::spawn(log.clone()).unwrap();

        let mut out = Vec::new();
        let code = launch(&env, &parsed(&["true"], false), &reaper, &mut out).unwrap();
        assert_eq!(code, 0);

        let _ = std::fs::remove_file(log);
    }

    #[test]
    #[cfg(unix)]
    fn test_background_returns_without_waiting() {
        let env = test_env();
        let log = temp_log("bg");
        let reaper = Reaper::spawn(log.clone()).unwrap();

        let start = Instant::now();
        let mut out = Vec::new();
        let code = launch(&env, &parsed(&["sleep", "5"], true), &reaper, &mut out).unwrap();
        assert_eq!(code, 0);
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "background launch must not wait for the child"
        );

        let report = String::from_utf8(out).unwrap();
        assert!(
            report.starts_with("Started background process: "),
            "unexpected report: {report:?}"
        );
        let pid: u32 = report
            .trim_start_matches("Started background process: ")
            .trim()
            .parse()
            .expect("pid in report");
        assert!(pid > 0);

        let _ = std::fs::remove_file(log);
    }

    #[test]
    #[cfg(unix)]
    fn test_env_bindings_are_exported_to_children() {
        let mut env = test_env();
        env.set_var("MARKER_FOR_CHILD", "present");
        let log = temp_log("envs");
        let reaper = Reaper::spawn(log.clone()).unwrap();

        let mut out = Vec::new();
        let code = launch(
            &env,
            &parsed(
                &["sh", "-c", "test \"$MARKER_FOR_CHILD\" = present"],
                false,
            ),
            &reaper,
            &mut out,
        )
        .unwrap();
        assert_eq!(code, 0, "child did not observe the exported binding");

        let _ = std::fs::remove_file(log);
    }

    #[test]
    fn test_spawn_failure_is_reported_not_fatal() {
        let env = test_env();
        let log = temp_log("nospawn");
        let reaper = Reaper::spawn(log.clone()).unwrap();

        let mut out = Vec::new();
        let res = launch(
            &env,
            &parsed(&["definitely_not_a_real_command_555"], false),
            &reaper,
            &mut out,
        );
        assert!(res.is_err());

        let _ = std::fs::remove_file(log);
    }
}
