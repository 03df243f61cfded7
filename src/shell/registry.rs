//! Command registry and dispatcher
//!
//! Every command, builtin or not, implements [`Command`] and is registered
//! once at startup. Lookup is exact and case-sensitive.

use std::collections::HashMap;
use std::io::{self, Write};

use anyhow::Result;
use colored::Colorize;

use super::alias::AliasTable;
use super::history::HistoryManager;
use super::path::{PathResolver, VirtualPath};
use super::variables::ShellVariables;
use crate::remote::RemoteFs;

/// Exit status for an unknown command
pub const EXIT_NOT_FOUND: i32 = 127;

/// Everything a command may touch while it runs.
pub struct CommandContext<'a> {
    pub remote: &'a dyn RemoteFs,
    pub resolver: &'a PathResolver,
    pub cwd: &'a mut VirtualPath,
    pub history: &'a mut HistoryManager,
    pub commands: &'a CommandRegistry,
    pub aliases: &'a mut AliasTable,
    pub variables: &'a mut ShellVariables,
    /// Set to request the end of the session with this status
    pub exit: &'a mut Option<i32>,
    pub out: &'a mut dyn Write,
    pub err: &'a mut dyn Write,
}

impl CommandContext<'_> {
    /// Resolve a path argument against the current directory.
    pub fn resolve(&self, token: &str) -> VirtualPath {
        self.resolver.resolve(&*self.cwd, token)
    }
}

pub trait Command {
    fn name(&self) -> &'static str;

    /// Heading the command is listed under by `help`
    fn category(&self) -> &'static str;

    /// One-line description
    fn summary(&self) -> &'static str;

    /// Synopsis line, e.g. `ls [-a] [-l] [path...]`
    fn usage(&self) -> &'static str {
        self.name()
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<i32>;

    fn show_help(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{} {}", "Usage:".bold(), self.usage())?;
        writeln!(out, "  {}", self.summary())
    }
}

#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command, replacing any previous one with the same name.
    pub fn register(&mut self, command: Box<dyn Command>) {
        self.commands.insert(command.name(), command);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Commands grouped by category; categories and commands sorted by name.
    pub fn by_category(&self) -> Vec<(&'static str, Vec<&dyn Command>)> {
        let mut groups: Vec<(&'static str, Vec<&dyn Command>)> = Vec::new();
        for name in self.names() {
            let Some(command) = self.get(name) else {
                continue;
            };
            match groups.iter_mut().find(|(cat, _)| *cat == command.category()) {
                Some((_, list)) => list.push(command),
                None => groups.push((command.category(), vec![command])),
            }
        }
        groups.sort_by_key(|(cat, _)| *cat);
        groups
    }

    /// Run `name` with `args` and return its exit status.
    ///
    /// - Unknown name: error message, 127
    /// - `-h` or `--help` among the args: the command's help, 0
    /// - Handler error: `name: error` on the error sink, 1
    pub fn dispatch(&self, name: &str, args: &[String], ctx: &mut CommandContext<'_>) -> i32 {
        let Some(command) = self.get(name) else {
            let _ = writeln!(ctx.err, "remsh: {}: command not found", name);
            log::debug!("dispatch {:?}: not found", name);
            return EXIT_NOT_FOUND;
        };

        if args.iter().any(|a| a == "-h" || a == "--help") {
            return match command.show_help(ctx.out) {
                Ok(()) => 0,
                Err(e) => {
                    let _ = writeln!(ctx.err, "{}: {}", name, e);
                    1
                }
            };
        }

        let code = match command.execute(ctx, args) {
            Ok(code) => code,
            Err(e) => {
                let _ = writeln!(ctx.err, "{}: {:#}", name, e);
                1
            }
        };
        log::debug!("dispatch {:?} {:?} -> {}", name, args, code);
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryFs;
    use anyhow::bail;

    struct Greet;

    impl Command for Greet {
        fn name(&self) -> &'static str {
            "greet"
        }
        fn category(&self) -> &'static str {
            "Test"
        }
        fn summary(&self) -> &'static str {
            "Say hello"
        }
        fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<i32> {
            writeln!(ctx.out, "hello {}", args.join(" "))?;
            Ok(3)
        }
    }

    struct Broken;

    impl Command for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn category(&self) -> &'static str {
            "Test"
        }
        fn summary(&self) -> &'static str {
            "Always fails"
        }
        fn execute(&self, _ctx: &mut CommandContext<'_>, _args: &[String]) -> Result<i32> {
            bail!("it broke")
        }
    }

    fn registry() -> CommandRegistry {
        let mut r = CommandRegistry::new();
        r.register(Box::new(Greet));
        r.register(Box::new(Broken));
        r
    }

    /// Dispatch `name args` against a scratch context, returning (code, out, err).
    fn run(reg: &CommandRegistry, name: &str, args: &[&str]) -> (i32, String, String) {
        let remote = MemoryFs::new();
        let resolver = PathResolver::new(VirtualPath::new("/root"));
        let mut cwd = VirtualPath::root();
        let mut history = HistoryManager::in_memory(10);
        let mut aliases = AliasTable::new();
        let mut variables = ShellVariables::new();
        let mut exit = None;
        let mut out = Vec::new();
        let mut err = Vec::new();
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();

        let code = {
            let mut ctx = CommandContext {
                remote: &remote,
                resolver: &resolver,
                cwd: &mut cwd,
                history: &mut history,
                commands: reg,
                aliases: &mut aliases,
                variables: &mut variables,
                exit: &mut exit,
                out: &mut out,
                err: &mut err,
            };
            reg.dispatch(name, &args, &mut ctx)
        };
        (code, String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    #[test]
    fn test_dispatch_returns_handler_code() {
        let (code, out, _) = run(&registry(), "greet", &["a", "b"]);
        assert_eq!(code, 3);
        assert_eq!(out, "hello a b\n");
    }

    #[test]
    fn test_unknown_command() {
        let (code, _, err) = run(&registry(), "nonexistent_cmd", &[]);
        assert_eq!(code, EXIT_NOT_FOUND);
        assert_eq!(err, "remsh: nonexistent_cmd: command not found\n");
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let (code, _, _) = run(&registry(), "GREET", &[]);
        assert_eq!(code, EXIT_NOT_FOUND);
    }

    #[test]
    fn test_help_flag_skips_execute() {
        for flag in ["-h", "--help"] {
            let (code, out, _) = run(&registry(), "broken", &["x", flag]);
            assert_eq!(code, 0);
            assert!(out.contains("Always fails"));
        }
    }

    #[test]
    fn test_handler_error_reported() {
        let (code, _, err) = run(&registry(), "broken", &[]);
        assert_eq!(code, 1);
        assert_eq!(err, "broken: it broke\n");
    }

    #[test]
    fn test_names_and_categories() {
        let reg = registry();
        assert_eq!(reg.names(), vec!["broken", "greet"]);
        let groups = reg.by_category();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, "Test");
        assert_eq!(groups[0].1.len(), 2);
        assert!(reg.contains("greet"));
        assert!(reg.get("nope").is_none());
    }
}
