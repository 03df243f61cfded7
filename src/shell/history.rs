//! Command history - bounded buffer, recall cursor, persistence
//!
//! The buffer holds at most `max_size` entries; the oldest is evicted first.
//! Each entry keeps the sequence number it was assigned when added, while
//! listings and `!N` use display numbers counted from 1 over the retained
//! entries.
//!
//! The history file is one command per line. Every change rewrites it in
//! full; a failed write is logged and otherwise ignored.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io;
use std::path::PathBuf;

pub const DEFAULT_HISTORY_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Sequence number, never reused after eviction
    pub number: u64,
    pub text: String,
}

/// Summary returned by [`HistoryManager::get_stats`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStats {
    pub total: usize,
    pub unique: usize,
    /// Most frequent text and its count
    pub most_used: Option<(String, usize)>,
    pub file: Option<PathBuf>,
}

#[derive(Debug)]
pub struct HistoryManager {
    entries: VecDeque<HistoryEntry>,
    max_size: usize,
    /// Recall cursor; `entries.len()` means "past the newest entry"
    cursor: usize,
    next_number: u64,
    path: Option<PathBuf>,
}

impl HistoryManager {
    /// Create a manager and load `path` if given.
    ///
    /// A `max_size` of zero is treated as one.
    pub fn new(max_size: usize, path: Option<PathBuf>) -> Self {
        let mut manager = Self {
            entries: VecDeque::new(),
            max_size: max_size.max(1),
            cursor: 0,
            next_number: 1,
            path,
        };
        manager.load();
        manager
    }

    /// In-memory history that never touches disk.
    pub fn in_memory(max_size: usize) -> Self {
        Self::new(max_size, None)
    }

    fn load(&mut self) {
        let Some(path) = self.path.clone() else {
            return;
        };
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return,
            Err(e) => {
                log::warn!("cannot read history file {}: {}", path.display(), e);
                return;
            }
        };

        let lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let skip = lines.len().saturating_sub(self.max_size);
        for line in &lines[skip..] {
            self.push(line.to_string());
        }
        self.cursor = self.entries.len();
        log::info!("loaded {} history entries from {}", self.entries.len(), path.display());
    }

    fn push(&mut self, text: String) {
        self.entries.push_back(HistoryEntry { number: self.next_number, text });
        self.next_number += 1;
        while self.entries.len() > self.max_size {
            self.entries.pop_front();
        }
    }

    /// Record a command line.
    ///
    /// Blank lines, `history` invocations and an immediate repeat of the
    /// newest entry are ignored.
    pub fn add_command(&mut self, command: &str) {
        let command = command.trim();
        if command.is_empty() {
            return;
        }
        if command.split_whitespace().next() == Some("history") {
            return;
        }
        if self.latest() == Some(command) {
            self.cursor = self.entries.len();
            return;
        }

        self.push(command.to_string());
        self.cursor = self.entries.len();
        self.persist();
    }

    /// Move the cursor back one entry. `None` at the oldest entry or when empty.
    pub fn get_previous(&mut self) -> Option<&str> {
        if self.entries.is_empty() || self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).map(|e| e.text.as_str())
    }

    /// Move the cursor forward one entry. Past the newest entry the cursor is
    /// parked one past the end and `None` is returned.
    pub fn get_next(&mut self) -> Option<&str> {
        if self.entries.is_empty() || self.cursor + 1 >= self.entries.len() {
            self.cursor = self.entries.len();
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor).map(|e| e.text.as_str())
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = self.entries.len();
    }

    /// The last `count` entries, oldest first; all of them for `None`.
    pub fn get_history(&self, count: Option<usize>) -> Vec<&str> {
        let skip = match count {
            Some(n) => self.entries.len().saturating_sub(n),
            None => 0,
        };
        self.entries.iter().skip(skip).map(|e| e.text.as_str()).collect()
    }

    /// `(display number, text)` pairs starting at display number `start`.
    pub fn get_numbered_history(&self, start: usize, count: Option<usize>) -> Vec<(usize, &str)> {
        let start = start.max(1);
        self.entries
            .iter()
            .enumerate()
            .skip(start - 1)
            .take(count.unwrap_or(usize::MAX))
            .map(|(i, e)| (i + 1, e.text.as_str()))
            .collect()
    }

    /// Display number of the first entry with exactly this text.
    pub fn get_command_number(&self, text: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.text == text).map(|i| i + 1)
    }

    /// Entry text by display number.
    pub fn get_entry(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(|e| e.text.as_str())
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.back().map(|e| e.text.as_str())
    }

    /// Newest entry starting with `prefix`.
    pub fn find_prefix(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.text.starts_with(prefix))
            .map(|e| e.text.as_str())
    }

    /// Case-insensitive substring search, oldest first.
    pub fn search_history(&self, needle: &str) -> Vec<&str> {
        let needle = needle.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.text.to_lowercase().contains(&needle))
            .map(|e| e.text.as_str())
            .collect()
    }

    pub fn get_stats(&self) -> HistoryStats {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for entry in &self.entries {
            let count = counts.entry(entry.text.as_str()).or_insert(0);
            if *count == 0 {
                order.push(entry.text.as_str());
            }
            *count += 1;
        }

        let mut most_used: Option<(&str, usize)> = None;
        for text in &order {
            let count = counts[text];
            if most_used.map_or(true, |(_, best)| count > best) {
                most_used = Some((*text, count));
            }
        }

        HistoryStats {
            total: self.entries.len(),
            unique: order.len(),
            most_used: most_used.map(|(text, count)| (text.to_string(), count)),
            file: self.path.clone(),
        }
    }

    /// Drop every entry and persist the empty history.
    pub fn clear_history(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.persist();
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the history file.
    pub fn save(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut content = String::new();
        for entry in &self.entries {
            content.push_str(&entry.text);
            content.push('\n');
        }
        fs::write(path, content)
    }

    /// Save, logging instead of returning a failure.
    pub fn persist(&self) {
        if let Err(e) = self.save() {
            if let Some(path) = &self.path {
                log::warn!("cannot write history file {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manager(cmds: &[&str]) -> HistoryManager {
        let mut h = HistoryManager::in_memory(DEFAULT_HISTORY_SIZE);
        for c in cmds {
            h.add_command(c);
        }
        h
    }

    #[test]
    fn test_consecutive_duplicates_dropped() {
        let h = manager(&["ls", "ls", "pwd", "pwd"]);
        assert_eq!(h.get_history(None), vec!["ls", "pwd"]);
        // non-consecutive repeats stay
        let h = manager(&["ls", "pwd", "ls"]);
        assert_eq!(h.get_history(None), vec!["ls", "pwd", "ls"]);
    }

    #[test]
    fn test_blank_and_history_commands_ignored() {
        let h = manager(&["  ", "", "history", "history 5", "  ls  "]);
        assert_eq!(h.get_history(None), vec!["ls"]);
    }

    #[test]
    fn test_cap_keeps_newest() {
        let mut h = HistoryManager::in_memory(10);
        for i in 0..15 {
            h.add_command(&format!("cmd{}", i));
        }
        assert_eq!(h.len(), 10);
        assert_eq!(h.get_history(Some(1)), vec!["cmd14"]);
        assert_eq!(h.get_entry(1), Some("cmd5"));
        // sequence numbers are not reused
        assert_eq!(h.entries().next().map(|e| e.number), Some(6));
        assert_eq!(h.entries().last().map(|e| e.number), Some(15));
    }

    #[test]
    fn test_get_history_counts() {
        let h = manager(&["a", "b", "c"]);
        assert_eq!(h.get_history(Some(0)), Vec::<&str>::new());
        assert_eq!(h.get_history(Some(2)), vec!["b", "c"]);
        assert_eq!(h.get_history(Some(10)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cursor_navigation() {
        let mut h = manager(&["a", "b", "c"]);
        assert_eq!(h.get_next(), None);
        assert_eq!(h.get_previous(), Some("c"));
        assert_eq!(h.get_previous(), Some("b"));
        assert_eq!(h.get_previous(), Some("a"));
        assert_eq!(h.get_previous(), None);
        assert_eq!(h.get_next(), Some("b"));
        assert_eq!(h.get_next(), Some("c"));
        assert_eq!(h.get_next(), None);
        // parked past the end, previous starts again from the newest
        assert_eq!(h.get_previous(), Some("c"));
        h.reset_cursor();
        assert_eq!(h.get_previous(), Some("c"));
    }

    #[test]
    fn test_cursor_on_empty_history() {
        let mut h = manager(&[]);
        assert_eq!(h.get_previous(), None);
        assert_eq!(h.get_next(), None);
    }

    #[test]
    fn test_add_moves_cursor_to_end() {
        let mut h = manager(&["a", "b"]);
        h.get_previous();
        h.get_previous();
        h.add_command("c");
        assert_eq!(h.get_previous(), Some("c"));
    }

    #[test]
    fn test_numbered_history_and_lookup() {
        let h = manager(&["ls", "pwd", "cat x"]);
        assert_eq!(h.get_numbered_history(2, None), vec![(2, "pwd"), (3, "cat x")]);
        assert_eq!(h.get_numbered_history(1, Some(1)), vec![(1, "ls")]);
        assert_eq!(h.get_command_number("pwd"), Some(2));
        assert_eq!(h.get_command_number("nope"), None);
        assert_eq!(h.get_entry(0), None);
        assert_eq!(h.get_entry(4), None);
        assert_eq!(h.find_prefix("c"), Some("cat x"));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let h = manager(&["cat README", "ls", "grep readme"]);
        assert_eq!(h.search_history("ReadMe"), vec!["cat README", "grep readme"]);
        assert!(h.search_history("zzz").is_empty());
    }

    #[test]
    fn test_stats() {
        let h = manager(&["ls", "pwd", "ls", "pwd", "cd"]);
        let stats = h.get_stats();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.unique, 3);
        // tie between ls and pwd goes to the first seen
        assert_eq!(stats.most_used, Some(("ls".to_string(), 2)));

        assert_eq!(manager(&[]).get_stats().most_used, None);
    }

    #[test]
    fn test_clear() {
        let mut h = manager(&["a", "b"]);
        h.clear_history();
        assert!(h.is_empty());
        assert_eq!(h.get_previous(), None);
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("history");

        let mut h = HistoryManager::new(100, Some(path.clone()));
        assert!(h.is_empty());
        h.add_command("ls -l");
        h.add_command("cat a.txt");
        assert_eq!(fs::read_to_string(&path).unwrap(), "ls -l\ncat a.txt\n");

        let reloaded = HistoryManager::new(100, Some(path.clone()));
        assert_eq!(reloaded.get_history(None), vec!["ls -l", "cat a.txt"]);
        assert_eq!(reloaded.entries().next().map(|e| e.number), Some(1));
    }

    #[test]
    fn test_load_trims_and_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history");
        fs::write(&path, "one\n\n  two  \n   \nthree\nfour\n").unwrap();

        let h = HistoryManager::new(3, Some(path));
        assert_eq!(h.get_history(None), vec!["two", "three", "four"]);
    }

    #[test]
    fn test_unwritable_file_keeps_memory_history() {
        let dir = tempdir().unwrap();
        // the history path is a directory, so every save fails
        let mut h = HistoryManager::new(10, Some(dir.path().to_path_buf()));
        h.add_command("ls");
        assert_eq!(h.get_history(None), vec!["ls"]);
        assert!(h.save().is_err());
    }

    #[test]
    fn test_clear_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history");
        let mut h = HistoryManager::new(10, Some(path.clone()));
        h.add_command("ls");
        h.clear_history();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
