//! Lexical analysis for one line of shell input.
//!
//! The grammar is deliberately small: a line is a sequence of words separated
//! by runs of spaces and tabs, with an optional `&` token anywhere in the line
//! marking the command for background execution. There is no quoting, no
//! escaping and no operator syntax.

/// Upper bound on the bytes of a line that are inspected.
///
/// Longer input is clipped, not rejected; everything past the bound is
/// silently ignored.
pub const MAX_LINE_BYTES: usize = 1024;

/// Upper bound on argument slots, the command name included.
///
/// Once the bound is reached the rest of the line — a trailing `&` included —
/// is silently dropped. Truncation is policy, not an error.
pub const MAX_ARGS: usize = 64;

/// One fully tokenized command line.
///
/// By convention of the underlying exec call, `args[0]` always equals `name`,
/// so `args` can be handed to a spawn primitive as the complete argument
/// vector. `name` is never empty: blank lines never produce a `ParsedCommand`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The command word, identical to `args[0]`.
    pub name: String,
    /// Full argument vector including the command name.
    pub args: Vec<String>,
    /// Whether a `&` token requested detached background execution.
    pub background: bool,
}

/// Tokenize a raw input line.
///
/// Returns `None` for lines that carry no command: empty lines, lines of only
/// whitespace, and lines consisting solely of `&` markers.
pub fn parse_line(line: &str) -> Option<ParsedCommand> {
    let line = clip(line, MAX_LINE_BYTES);

    let mut args: Vec<String> = Vec::new();
    let mut background = false;

    for token in line.split([' ', '\t']).filter(|t| !t.is_empty()) {
        if args.len() == MAX_ARGS {
            break;
        }
        if token == "&" {
            background = true;
            continue;
        }
        args.push(token.to_string());
    }

    let name = args.first()?.clone();
    Some(ParsedCommand {
        name,
        args,
        background,
    })
}

/// Truncate `line` to at most `max` bytes without splitting a UTF-8 character.
fn clip(line: &str, max: usize) -> &str {
    if line.len() <= max {
        return line;
    }
    let mut end = max;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}
