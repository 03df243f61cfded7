//! Tab completion for the interactive prompt
//!
//! First word: registered command names. Later words: entries of the remote
//! directory named by the word so far, relative to the virtual cwd.

use std::borrow::Cow;
use std::rc::Rc;

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::Context;
use rustyline::Helper;

use super::path::{PathResolver, VirtualPath};
use crate::remote::RemoteFs;

pub struct RemshHelper {
    commands: Vec<String>,
    remote: Rc<dyn RemoteFs>,
    resolver: PathResolver,
    /// Directory that relative words complete against
    pub cwd: VirtualPath,
}

impl RemshHelper {
    pub fn new(
        commands: Vec<String>,
        remote: Rc<dyn RemoteFs>,
        resolver: PathResolver,
        cwd: VirtualPath,
    ) -> Self {
        Self { commands, remote, resolver, cwd }
    }

    pub fn set_cwd(&mut self, cwd: VirtualPath) {
        self.cwd = cwd;
    }

    fn complete_command(&self, partial: &str) -> Vec<Pair> {
        self.commands
            .iter()
            .filter(|cmd| cmd.starts_with(partial))
            .map(|cmd| Pair { display: cmd.clone(), replacement: cmd.clone() })
            .collect()
    }

    /// Complete remote paths
    fn complete_path(&self, partial: &str) -> Vec<Pair> {
        let (dir_part, prefix) = match partial.rfind('/') {
            Some(i) => partial.split_at(i + 1),
            None => ("", partial),
        };
        let dir = self.resolver.resolve(&self.cwd, dir_part);

        let Ok(mut names) = self.remote.list_entries(&dir) else {
            return Vec::new();
        };
        names.sort();

        names
            .into_iter()
            .filter(|name| name.starts_with(prefix))
            .filter(|name| prefix.starts_with('.') || !name.starts_with('.'))
            .map(|name| {
                let suffix = if self.remote.is_dir(&dir.join(&name)) { "/" } else { "" };
                let display = format!("{}{}", name, suffix);
                let replacement = format!("{}{}", dir_part, display);
                Pair { display, replacement }
            })
            .collect()
    }
}

/// Start offset and raw text of each word up to the cursor, quote-aware.
fn words_to_cursor(line: &str) -> Vec<(usize, String)> {
    let mut words: Vec<(usize, String)> = Vec::new();
    let mut buf = String::new();
    let mut start: Option<usize> = None;
    let mut in_single = false;
    let mut in_double = false;

    for (i, c) in line.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            ' ' | '\t' if !in_single && !in_double => {
                if let Some(s) = start.take() {
                    words.push((s, std::mem::take(&mut buf)));
                }
                continue;
            }
            _ => {}
        }
        start.get_or_insert(i);
        buf.push(c);
    }
    if let Some(s) = start {
        words.push((s, buf));
    }
    words
}

impl Completer for RemshHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_cursor = &line[..pos];
        let words = words_to_cursor(line_to_cursor);

        let ends_with_space = line_to_cursor.ends_with(' ') || line_to_cursor.ends_with('\t');
        let (current_start, current_raw) = if ends_with_space {
            (pos, String::new())
        } else {
            words.last().cloned().unwrap_or((pos, String::new()))
        };

        let is_first_word = words.len() <= 1 && !ends_with_space;
        if is_first_word {
            return Ok((current_start, self.complete_command(&current_raw)));
        }

        let quote = current_raw.chars().next().filter(|c| *c == '"' || *c == '\'');
        let partial = match quote {
            Some(q) => current_raw.trim_start_matches(q).to_string(),
            None => current_raw.clone(),
        };
        // keep the opening quote in place
        let start = if quote.is_some() { current_start + 1 } else { current_start };

        let mut candidates = self.complete_path(&partial);
        if quote.is_none() {
            for cand in &mut candidates {
                if cand.replacement.contains(' ') {
                    cand.replacement = format!("\"{}\"", cand.replacement);
                }
            }
        }
        Ok((start, candidates))
    }
}

impl Highlighter for RemshHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[90m{}\x1b[0m", hint))
    }
}

impl Hinter for RemshHelper {
    type Hint = String;
}

impl Validator for RemshHelper {}

impl Helper for RemshHelper {}
