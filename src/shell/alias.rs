//! Command aliases
//!
//! An alias replaces the first word of a command before variables are
//! expanded and the line is tokenized. Replacement repeats while the new
//! first word is another alias, stopping at a name already expanded.

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};

const MAX_EXPANSIONS: usize = 16;

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthands available in every session
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        for (name, value) in [
            ("ll", "ls -l -a"),
            ("la", "ls -a"),
            ("l", "ls"),
            ("h", "history"),
            ("q", "exit"),
        ] {
            table.aliases.insert(name.to_string(), value.to_string());
        }
        table
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// Define or redefine `name`.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let invalid = |c: char| c.is_whitespace() || matches!(c, '=' | '/' | '\'' | '"' | '\\' | '$');
        if name.is_empty() || name.chars().any(invalid) {
            bail!("`{}': invalid alias name", name);
        }
        self.aliases.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Remove `name`, returning whether it was defined.
    pub fn remove(&mut self, name: &str) -> bool {
        self.aliases.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.aliases.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }

    /// All aliases sorted by name.
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> =
            self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        pairs.sort_unstable();
        pairs
    }

    /// Expand an alias in the first word of `command`.
    pub fn expand(&self, command: &str) -> String {
        let mut current = command.trim_start().to_string();
        let mut seen: HashSet<String> = HashSet::new();

        for _ in 0..MAX_EXPANSIONS {
            let end = current.find(char::is_whitespace).unwrap_or(current.len());
            let first = &current[..end];
            let Some(replacement) = self.aliases.get(first) else {
                break;
            };
            if !seen.insert(first.to_string()) {
                break;
            }
            log::debug!("alias {:?} -> {:?}", first, replacement);
            current = format!("{}{}", replacement, &current[end..]).trim_start().to_string();
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> AliasTable {
        let mut t = AliasTable::new();
        for (name, value) in pairs {
            t.set(name, value).unwrap();
        }
        t
    }

    #[test]
    fn test_expand_first_word_only() {
        let t = table(&[("ll", "ls -l")]);
        assert_eq!(t.expand("ll /etc"), "ls -l /etc");
        assert_eq!(t.expand("echo ll"), "echo ll");
        assert_eq!(t.expand("ll"), "ls -l");
    }

    #[test]
    fn test_chained_aliases() {
        let t = table(&[("a", "b -x"), ("b", r#"echo "hello world""#)]);
        assert_eq!(t.expand("a y"), r#"echo "hello world" -x y"#);
    }

    #[test]
    fn test_self_reference_stops() {
        let t = table(&[("ls", "ls -a")]);
        assert_eq!(t.expand("ls docs"), "ls -a docs");

        let t = table(&[("x", "y"), ("y", "x")]);
        assert_eq!(t.expand("x 1"), "x 1");
    }

    #[test]
    fn test_empty_alias_drops_word() {
        let t = table(&[("noop", "")]);
        assert_eq!(t.expand("noop echo hi"), "echo hi");
    }

    #[test]
    fn test_quoted_word_is_not_an_alias() {
        let t = table(&[("ll", "ls -l")]);
        assert_eq!(t.expand("'ll' x"), "'ll' x");
    }

    #[test]
    fn test_invalid_names_rejected() {
        let mut t = AliasTable::new();
        assert!(t.set("", "ls").is_err());
        assert!(t.set("a b", "ls").is_err());
        assert!(t.set("a=b", "ls").is_err());
        assert!(t.get("a b").is_none());
    }

    #[test]
    fn test_defaults_and_listing() {
        let mut t = AliasTable::with_defaults();
        assert_eq!(t.get("ll"), Some("ls -l -a"));
        assert!(t.remove("ll"));
        assert!(!t.remove("ll"));
        t.clear();
        assert!(t.sorted().is_empty());
    }
}
