//! History expansion, applied to the raw line before tokenization
//!
//! Forms:
//! - `^old^new[^suffix]` - last command with the first `old` replaced
//! - `!!`                - last command
//! - `!N`                - command number N in the listing
//! - `!prefix`           - newest command starting with `prefix`
//!
//! Bang forms must make up the whole line. At most one expansion is applied.

use thiserror::Error;

use super::history::HistoryManager;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpansionError {
    #[error("no previous command")]
    NoPreviousCommand,

    #[error("empty search string in substitution")]
    EmptySubstitution,

    #[error("'{old}' not found in last command: {last}")]
    NotFoundInLast { old: String, last: String },

    #[error("command number {number} out of range (1-{len})")]
    OutOfRange { number: u64, len: usize },

    #[error("no command found starting with '{0}'")]
    NoMatchingPrefix(String),
}

/// Expand `line` against `history`.
///
/// Lines that hold no expansion come back trimmed but otherwise unchanged.
pub fn expand(line: &str, history: &HistoryManager) -> Result<String, ExpansionError> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix('^') {
        return quick_substitution(line, rest, history);
    }

    let Some(rest) = line.strip_prefix('!') else {
        return Ok(line.to_string());
    };

    if rest.is_empty() {
        return Ok(line.to_string());
    }

    if rest == "!" {
        return history
            .latest()
            .map(str::to_string)
            .ok_or(ExpansionError::NoPreviousCommand);
    }

    if rest.bytes().all(|b| b.is_ascii_digit()) {
        let len = history.len();
        // saturate absurdly long digit strings so they land out of range
        let number = rest.parse::<u64>().unwrap_or(u64::MAX);
        return usize::try_from(number)
            .ok()
            .and_then(|n| history.get_entry(n))
            .map(str::to_string)
            .ok_or(ExpansionError::OutOfRange { number, len });
    }

    history
        .find_prefix(rest)
        .map(str::to_string)
        .ok_or_else(|| ExpansionError::NoMatchingPrefix(rest.to_string()))
}

fn quick_substitution(
    line: &str,
    rest: &str,
    history: &HistoryManager,
) -> Result<String, ExpansionError> {
    let mut parts = rest.splitn(3, '^');
    let old = parts.next().unwrap_or_default();
    let Some(new) = parts.next() else {
        // single caret, not a substitution
        return Ok(line.to_string());
    };
    let suffix = parts.next().unwrap_or_default();

    let last = history.latest().ok_or(ExpansionError::NoPreviousCommand)?;
    if old.is_empty() {
        return Err(ExpansionError::EmptySubstitution);
    }
    if !last.contains(old) {
        return Err(ExpansionError::NotFoundInLast {
            old: old.to_string(),
            last: last.to_string(),
        });
    }

    let mut expanded = last.replacen(old, new, 1);
    expanded.push_str(suffix);
    Ok(expanded)
}
