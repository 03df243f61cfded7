//! Wildcard expansion against a remote directory listing
//!
//! Only the last path component may hold wildcards (`src/*.rs`, `/etc/*.conf`,
//! `file?.txt`, `[ab]*`). The directory part is resolved through the
//! [`PathResolver`] and listed once. There is no `**` recursion.
//!
//! A wildcard followed by `/` (`*/`, `src*/main.rs`) sits in a directory
//! component, so the token stays literal. Picking out directories would need
//! a stat per entry on top of the single listing.

use ::glob::{MatchOptions, Pattern};

use super::parser::Token;
use super::path::{PathResolver, VirtualPath};
use crate::remote::{DirectoryLister, RemoteError};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Expand one token.
///
/// - Non-glob tokens come back unchanged.
/// - Matches keep the directory prefix as typed and are sorted.
/// - No matches (or an invalid pattern) leaves the literal token text.
/// - A failed listing is returned as the error so the caller can report it.
pub fn expand(
    token: &Token,
    cwd: &VirtualPath,
    resolver: &PathResolver,
    lister: &(impl DirectoryLister + ?Sized),
) -> Result<Vec<String>, RemoteError> {
    let literal = || vec![token.text.clone()];

    let (Some(pattern), Some(wildcard_at)) = (token.pattern(), token.wildcard_offset()) else {
        return Ok(literal());
    };

    let (prefix, name_pattern) = match (token.text.rfind('/'), pattern.rfind('/')) {
        (Some(text_slash), Some(pattern_slash)) => {
            if wildcard_at < text_slash {
                // wildcard in a directory component
                return Ok(literal());
            }
            (&token.text[..=text_slash], &pattern[pattern_slash + 1..])
        }
        _ => ("", pattern),
    };

    let Ok(matcher) = Pattern::new(name_pattern) else {
        return Ok(literal());
    };

    let dir = resolver.resolve(cwd, prefix);
    let entries = lister.list_entries(&dir)?;

    let mut matches: Vec<String> = entries
        .iter()
        .filter(|name| name.as_str() != "." && name.as_str() != "..")
        .filter(|name| matcher.matches_with(name, MATCH_OPTIONS))
        .map(|name| format!("{}{}", prefix, name))
        .collect();

    log::debug!("glob {:?} in {}: {} match(es)", token.text, dir, matches.len());

    if matches.is_empty() {
        return Ok(literal());
    }
    matches.sort();
    Ok(matches)
}
