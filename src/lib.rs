//! A small interactive command interpreter.
//!
//! This crate implements the dispatch pipeline of a line-oriented shell: input
//! tokenization, classification of the command word (builtin, executable on
//! PATH, or unknown), and process execution with foreground/background
//! semantics. Built-in `cd`, `echo` and `export` run in-process; everything
//! else is spawned as a child, either waited on synchronously or detached into
//! its own session with termination collected asynchronously by a reaper
//! thread and recorded in a best-effort log.
//!
//! The main entry point is [`Interpreter`], which owns the environment context
//! and the reaper and drives the read-classify-dispatch loop. The public
//! modules [`tokenizer`], [`classifier`] and [`env`] expose the pipeline's
//! building blocks individually.

mod builtin;
pub mod classifier;
pub mod env;
mod external;
mod interpreter;
pub mod reaper;
pub mod tokenizer;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Interpreter, Outcome};
