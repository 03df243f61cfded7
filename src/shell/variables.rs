//! Shell variables
//!
//! `NAME=value` on its own sets a variable; `$NAME`, `${NAME}` and `$?`
//! expand before a command is tokenized. Expansion is skipped inside single
//! quotes and after a backslash. Unset names expand to nothing.

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use super::parser::QuoteMode;

#[derive(Debug, Clone, Default)]
pub struct ShellVariables {
    values: HashMap<String, String>,
}

impl ShellVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }

    /// Remove `name`, returning whether it was set.
    pub fn unset(&mut self, name: &str) -> bool {
        self.values.remove(name).is_some()
    }

    /// All variables sorted by name.
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> =
            self.values.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        pairs.sort_unstable();
        pairs
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Recognize `NAME=value` given the command's source text and its single
/// tokenized word. The name must be written unquoted.
pub fn assignment<'a>(source: &str, word: &'a str) -> Option<(&'a str, &'a str)> {
    let (name, _) = source.trim().split_once('=')?;
    if !is_valid_name(name) {
        return None;
    }
    let value = word.strip_prefix(name)?.strip_prefix('=')?;
    Some((&word[..name.len()], value))
}

enum Reference {
    Name(String),
    /// `$` not followed by a name, or an unclosed `${`
    Literal(String),
}

fn read_reference(chars: &mut Peekable<Chars<'_>>) -> Reference {
    match chars.peek().copied() {
        Some('{') => {
            chars.next();
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    return Reference::Name(name);
                }
                name.push(c);
            }
            Reference::Literal(format!("${{{}", name))
        }
        Some('?') => {
            chars.next();
            Reference::Name("?".to_string())
        }
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                name.push(c);
                chars.next();
            }
            Reference::Name(name)
        }
        _ => Reference::Literal("$".to_string()),
    }
}

/// Escape `value` so the tokenizer reads it back verbatim. Unquoted values
/// still split on whitespace and may glob.
fn push_value(out: &mut String, value: &str, mode: QuoteMode) {
    for c in value.chars() {
        let escape = match mode {
            QuoteMode::Double => matches!(c, '"' | '\\'),
            _ => matches!(c, '"' | '\\' | '\''),
        };
        if escape {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Expand variable references in `line`, looking names up with `lookup`.
///
/// # Examples
/// ```
/// use remsh::shell::variables::expand;
///
/// let lookup = |name: &str| (name == "DIR").then(|| "/srv/app".to_string());
/// assert_eq!(expand("ls $DIR/logs '$DIR'", lookup), "ls /srv/app/logs '$DIR'");
/// ```
pub fn expand(line: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    if !line.contains('$') {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len());
    let mut mode = QuoteMode::None;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match (mode, ch) {
            (QuoteMode::Single, '\'') => {
                mode = QuoteMode::None;
                out.push(ch);
            }
            (QuoteMode::Single, _) => out.push(ch),
            (QuoteMode::Double, '\\') if chars.peek() == Some(&'$') => {
                // the tokenizer keeps `\$` inside double quotes, so drop the backslash here
                chars.next();
                out.push('$');
            }
            (_, '\\') => {
                out.push(ch);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            (QuoteMode::None, '\'') => {
                mode = QuoteMode::Single;
                out.push(ch);
            }
            (QuoteMode::None, '"') => {
                mode = QuoteMode::Double;
                out.push(ch);
            }
            (QuoteMode::Double, '"') => {
                mode = QuoteMode::None;
                out.push(ch);
            }
            (_, '$') => match read_reference(&mut chars) {
                Reference::Name(name) => {
                    if let Some(value) = lookup(&name) {
                        push_value(&mut out, &value, mode);
                    }
                }
                Reference::Literal(text) => out.push_str(&text),
            },
            _ => out.push(ch),
        }
    }
    out
}
