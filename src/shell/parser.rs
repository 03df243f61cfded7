//! Command line tokenizer - quote and escape aware
//!
//! Supports:
//! - Single quotes: `'a b'` (everything literal)
//! - Double quotes: `"a \"b\""` (only `\"` and `\\` are escapes)
//! - Backslash escapes outside quotes: `a\ b`, `\*`
//! - Adjacent parts joined into one word: `pre'fix'"suffix"`
//! - Chaining: `cmd1; cmd2`, `cmd1 && cmd2`, `cmd1 || cmd2`
//!
//! `&&` and `||` bind equally and left to right, so `a && b || c` runs `c`
//! whenever `a` or `b` failed.
//!
//! Glob metacharacters (`*`, `?`, `[`) count only when they appear outside
//! quotes and unescaped. Each token carries a pattern source in which every
//! literal metacharacter is escaped, so `"*".txt` never matches `a.txt`.

use thiserror::Error;

use crate::remote::{DirectoryLister, RemoteError};
use super::glob;
use super::path::{PathResolver, VirtualPath};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("unexpected end of line while looking for matching `{quote}' (opened at column {column})")]
    UnterminatedQuote { quote: char, column: usize },
    #[error("unexpected token `{0}'")]
    UnexpectedOperator(&'static str),
}

/// Quoting mode of the scanner
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum QuoteMode {
    None,
    Single,
    Double,
}

/// One shell word after quote removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Text with quotes and escapes removed
    pub text: String,
    /// Some part of the word was single or double quoted
    pub quoted: bool,
    /// Contains an unquoted, unescaped `*`, `?` or `[`
    pub glob: bool,
    pattern: String,
    wildcard_at: Option<usize>,
}

impl Token {
    /// Pattern source for glob matching, `None` unless glob-eligible.
    pub fn pattern(&self) -> Option<&str> {
        self.glob.then_some(self.pattern.as_str())
    }

    /// Byte offset in `text` of the first active wildcard.
    pub fn wildcard_offset(&self) -> Option<usize> {
        self.wildcard_at
    }
}

#[derive(Debug, Default)]
struct WordBuilder {
    text: String,
    pattern: String,
    quoted: bool,
    wildcard_at: Option<usize>,
    started: bool,
}

impl WordBuilder {
    /// Character taken literally (quoted or escaped).
    fn push_literal(&mut self, c: char) {
        self.started = true;
        self.text.push(c);
        if is_glob_meta(c) {
            self.pattern.push_str(&::glob::Pattern::escape(&c.to_string()));
        } else {
            self.pattern.push(c);
        }
    }

    /// Unquoted character, may act as a wildcard.
    fn push_raw(&mut self, c: char) {
        self.started = true;
        if matches!(c, '*' | '?' | '[') && self.wildcard_at.is_none() {
            self.wildcard_at = Some(self.text.len());
        }
        self.text.push(c);
        self.pattern.push(c);
    }

    fn open_quote(&mut self) {
        self.started = true;
        self.quoted = true;
    }

    fn finish(&mut self, tokens: &mut Vec<Token>) {
        if !self.started {
            return;
        }
        let word = std::mem::take(self);
        tokens.push(Token {
            text: word.text,
            quoted: word.quoted,
            glob: word.wildcard_at.is_some(),
            pattern: word.pattern,
            wildcard_at: word.wildcard_at,
        });
    }
}

fn is_glob_meta(c: char) -> bool {
    matches!(c, '*' | '?' | '[' | ']')
}

/// Split a line into tokens.
///
/// Whitespace-only input yields no tokens. An unterminated quote is an error;
/// it is never closed implicitly.
pub fn tokenize(input: &str) -> Result<Vec<Token>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut word = WordBuilder::default();
    let mut mode = QuoteMode::None;
    let mut quote_column = 0usize;

    let mut chars = input.chars().enumerate().peekable();

    while let Some((i, ch)) = chars.next() {
        match mode {
            QuoteMode::Single => {
                if ch == '\'' {
                    mode = QuoteMode::None;
                } else {
                    word.push_literal(ch);
                }
            }
            QuoteMode::Double => match ch {
                '"' => mode = QuoteMode::None,
                '\\' => match chars.peek() {
                    Some(&(_, next)) if next == '"' || next == '\\' => {
                        word.push_literal(next);
                        chars.next();
                    }
                    _ => word.push_literal('\\'),
                },
                c => word.push_literal(c),
            },
            QuoteMode::None => match ch {
                '\'' => {
                    word.open_quote();
                    mode = QuoteMode::Single;
                    quote_column = i + 1;
                }
                '"' => {
                    word.open_quote();
                    mode = QuoteMode::Double;
                    quote_column = i + 1;
                }
                '\\' => match chars.next() {
                    Some((_, next)) => word.push_literal(next),
                    None => word.push_literal('\\'),
                },
                c if c.is_whitespace() => word.finish(&mut tokens),
                c => word.push_raw(c),
            },
        }
    }

    match mode {
        QuoteMode::Single => {
            return Err(TokenizeError::UnterminatedQuote { quote: '\'', column: quote_column })
        }
        QuoteMode::Double => {
            return Err(TokenizeError::UnterminatedQuote { quote: '"', column: quote_column })
        }
        QuoteMode::None => {}
    }

    word.finish(&mut tokens);
    Ok(tokens)
}

/// How a chained command depends on the status of the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    /// First command, or after `;`
    Always,
    /// After `&&`
    And,
    /// After `||`
    Or,
}

impl Connector {
    pub fn should_run(self, last_status: i32) -> bool {
        match self {
            Connector::Always => true,
            Connector::And => last_status == 0,
            Connector::Or => last_status != 0,
        }
    }
}

/// One command of a chain, still in source form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub connector: Connector,
    pub text: String,
}

fn push_segment(
    segments: &mut Vec<Segment>,
    current: &mut String,
    connector: Connector,
    op: &'static str,
) -> Result<(), TokenizeError> {
    let text = std::mem::take(current);
    let text = text.trim();
    if text.is_empty() {
        return Err(TokenizeError::UnexpectedOperator(op));
    }
    segments.push(Segment { connector, text: text.to_string() });
    Ok(())
}

/// Split a line at `;`, `&&` and `||` outside quotes and escapes.
///
/// Segment text keeps its quotes for the tokenizer. A trailing `;` is
/// allowed; an operator with no command on either side is an error, as is
/// an unterminated quote anywhere in the line. A lone `|` or `&` is an
/// ordinary character.
pub fn split_chain(input: &str) -> Result<Vec<Segment>, TokenizeError> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut connector = Connector::Always;
    let mut mode = QuoteMode::None;
    let mut quote_column = 0usize;

    let mut chars = input.chars().enumerate().peekable();

    while let Some((i, ch)) = chars.next() {
        match mode {
            QuoteMode::Single => {
                if ch == '\'' {
                    mode = QuoteMode::None;
                }
                current.push(ch);
            }
            QuoteMode::Double => {
                current.push(ch);
                match ch {
                    '"' => mode = QuoteMode::None,
                    '\\' => {
                        if let Some((_, next)) = chars.next() {
                            current.push(next);
                        }
                    }
                    _ => {}
                }
            }
            QuoteMode::None => {
                let following = chars.peek().map(|&(_, c)| c);
                let op = match (ch, following) {
                    (';', _) => Some((";", Connector::Always)),
                    ('&', Some('&')) => Some(("&&", Connector::And)),
                    ('|', Some('|')) => Some(("||", Connector::Or)),
                    _ => None,
                };
                if let Some((op, next)) = op {
                    if op.len() == 2 {
                        chars.next();
                    }
                    push_segment(&mut segments, &mut current, connector, op)?;
                    connector = next;
                    continue;
                }

                current.push(ch);
                match ch {
                    '\'' => {
                        mode = QuoteMode::Single;
                        quote_column = i + 1;
                    }
                    '"' => {
                        mode = QuoteMode::Double;
                        quote_column = i + 1;
                    }
                    '\\' => {
                        if let Some((_, next)) = chars.next() {
                            current.push(next);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    match mode {
        QuoteMode::Single => {
            return Err(TokenizeError::UnterminatedQuote { quote: '\'', column: quote_column })
        }
        QuoteMode::Double => {
            return Err(TokenizeError::UnterminatedQuote { quote: '"', column: quote_column })
        }
        QuoteMode::None => {}
    }

    if !current.trim().is_empty() {
        push_segment(&mut segments, &mut current, connector, ";")?;
    } else if connector == Connector::And {
        return Err(TokenizeError::UnexpectedOperator("&&"));
    } else if connector == Connector::Or {
        return Err(TokenizeError::UnexpectedOperator("||"));
    }
    Ok(segments)
}

/// Split a line into plain argument strings, ignoring glob flags.
pub fn split_args(input: &str) -> Result<Vec<String>, TokenizeError> {
    Ok(tokenize(input)?.into_iter().map(|t| t.text).collect())
}

/// A tokenized line ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub tokens: Vec<Token>,
    /// First token
    pub name: String,
    /// Remaining tokens; glob-expanded after [`CommandLine::expand`]
    pub args: Vec<String>,
}

impl CommandLine {
    /// Tokenize `line`. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, TokenizeError> {
        let tokens = tokenize(line)?;
        let Some(first) = tokens.first() else {
            return Ok(None);
        };
        Ok(Some(Self {
            name: first.text.clone(),
            args: tokens[1..].iter().map(|t| t.text.clone()).collect(),
            tokens,
        }))
    }

    /// Replace the argument vector with its glob expansion.
    ///
    /// The command name is never expanded. Each glob token costs one remote
    /// listing; a failed listing aborts the whole expansion.
    pub fn expand(
        &mut self,
        cwd: &VirtualPath,
        resolver: &PathResolver,
        lister: &(impl DirectoryLister + ?Sized),
    ) -> Result<(), RemoteError> {
        let mut args = Vec::with_capacity(self.tokens.len().saturating_sub(1));
        for token in self.tokens.iter().skip(1) {
            args.extend(glob::expand(token, cwd, resolver, lister)?);
        }
        self.args = args;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        split_args(input).unwrap()
    }

    #[test]
    fn test_simple_split() {
        assert_eq!(texts("ls -la"), vec!["ls", "-la"]);
        assert_eq!(texts("  ls \t  -la  "), vec!["ls", "-la"]);
    }

    #[test]
    fn test_quoted_args() {
        assert_eq!(texts(r#"echo "hello world""#), vec!["echo", "hello world"]);
        assert_eq!(texts("echo 'hello world'"), vec!["echo", "hello world"]);
    }

    #[test]
    fn test_mixed_quotes() {
        assert_eq!(texts(r#"echo "hello 'world'""#), vec!["echo", "hello 'world'"]);
        assert_eq!(texts("echo 'hello \"world\"'"), vec!["echo", "hello \"world\""]);
    }

    #[test]
    fn test_single_quotes_are_literal() {
        assert_eq!(texts(r"echo 'a\nb\\c'"), vec!["echo", r"a\nb\\c"]);
    }

    #[test]
    fn test_double_quote_escapes() {
        assert_eq!(texts(r#"echo "say \"hi\"""#), vec!["echo", r#"say "hi""#]);
        assert_eq!(texts(r#"echo "a\\b""#), vec!["echo", r"a\b"]);
        // other backslashes stay put
        assert_eq!(texts(r#"echo "a\nb\$""#), vec!["echo", r"a\nb\$"]);
    }

    #[test]
    fn test_unquoted_backslash_escape() {
        assert_eq!(texts(r"cat my\ file.txt"), vec!["cat", "my file.txt"]);
        assert_eq!(texts(r"echo \'x\'"), vec!["echo", "'x'"]);
        assert_eq!(texts(r"echo trailing\"), vec!["echo", r"trailing\"]);
    }

    #[test]
    fn test_adjacent_parts_join() {
        assert_eq!(texts(r#"a'b c'"d e"f"#), vec!["ab cd ef"]);
    }

    #[test]
    fn test_empty_quotes_make_empty_token() {
        let tokens = tokenize("echo '' \"\"").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].text, "");
        assert!(tokens[1].quoted);
        assert_eq!(tokens[2].text, "");
    }

    #[test]
    fn test_whitespace_only_yields_nothing() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   \t ").unwrap().is_empty());
        assert_eq!(CommandLine::parse("  ").unwrap(), None);
    }

    #[test]
    fn test_unterminated_quote_is_error() {
        assert_eq!(
            tokenize("echo 'oops").unwrap_err(),
            TokenizeError::UnterminatedQuote { quote: '\'', column: 6 }
        );
        assert!(matches!(
            tokenize("echo \"a b"),
            Err(TokenizeError::UnterminatedQuote { quote: '"', .. })
        ));
        assert!(tokenize(r#"echo "a \" b"#).is_err());
    }

    #[test]
    fn test_glob_flags() {
        let tokens = tokenize(r#"ls *.txt "*.txt" \*.txt file? [ab]c plain"#).unwrap();
        let flags: Vec<bool> = tokens.iter().map(|t| t.glob).collect();
        assert_eq!(flags, vec![false, true, false, false, true, true, false]);
        assert!(tokens[2].quoted);
        assert!(!tokens[1].quoted);
    }

    #[test]
    fn test_pattern_escapes_literal_metachars() {
        let tokens = tokenize(r#""a*"*"#).unwrap();
        assert_eq!(tokens[0].text, "a**");
        assert_eq!(tokens[0].pattern(), Some("a[*]*"));

        let tokens = tokenize("plain").unwrap();
        assert_eq!(tokens[0].pattern(), None);
    }

    #[test]
    fn test_rejoin_is_idempotent() {
        for line in [r#"grep -n "needle" 'src' lib"#, "  cat   a.txt\tb.txt ", "echo x'y'z"] {
            let first = texts(line);
            assert_eq!(texts(&first.join(" ")), first);
        }
    }

    #[test]
    fn test_command_line_parts() {
        let cmd = CommandLine::parse("cat 'a b' c").unwrap().unwrap();
        assert_eq!(cmd.name, "cat");
        assert_eq!(cmd.args, vec!["a b", "c"]);
        assert_eq!(cmd.tokens.len(), 3);
    }

    fn chain(input: &str) -> Vec<(Connector, String)> {
        split_chain(input).unwrap().into_iter().map(|s| (s.connector, s.text)).collect()
    }

    #[test]
    fn test_chain_operators() {
        assert_eq!(
            chain("cd /tmp && ls || echo failed; pwd"),
            vec![
                (Connector::Always, "cd /tmp".to_string()),
                (Connector::And, "ls".to_string()),
                (Connector::Or, "echo failed".to_string()),
                (Connector::Always, "pwd".to_string()),
            ]
        );
        assert_eq!(chain("pwd;"), vec![(Connector::Always, "pwd".to_string())]);
        assert!(chain("   ").is_empty());
    }

    #[test]
    fn test_chain_operators_inside_quotes_are_text() {
        assert_eq!(
            chain(r#"echo 'a; b' "c && d" e\;f"#),
            vec![(Connector::Always, r#"echo 'a; b' "c && d" e\;f"#.to_string())]
        );
        // single | and & are not operators
        assert_eq!(chain("echo a|b & c"), vec![(Connector::Always, "echo a|b & c".to_string())]);
    }

    #[test]
    fn test_chain_missing_command_is_error() {
        assert_eq!(split_chain("&& ls"), Err(TokenizeError::UnexpectedOperator("&&")));
        assert_eq!(split_chain("ls ||"), Err(TokenizeError::UnexpectedOperator("||")));
        assert_eq!(split_chain("ls ;; pwd"), Err(TokenizeError::UnexpectedOperator(";")));
        assert_eq!(split_chain(";"), Err(TokenizeError::UnexpectedOperator(";")));
        assert!(matches!(
            split_chain("echo 'a; pwd"),
            Err(TokenizeError::UnterminatedQuote { quote: '\'', column: 6 })
        ));
    }

    #[test]
    fn test_connector_gating() {
        assert!(Connector::Always.should_run(1));
        assert!(Connector::And.should_run(0));
        assert!(!Connector::And.should_run(2));
        assert!(Connector::Or.should_run(127));
        assert!(!Connector::Or.should_run(0));
    }
}
