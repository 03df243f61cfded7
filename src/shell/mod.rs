//! Shell core module

pub mod alias;
pub mod builtin;
pub mod completer;
pub mod expansion;
pub mod glob;
pub mod history;
pub mod parser;
pub mod path;
pub mod registry;
pub mod variables;

use std::io::{self, Write};
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;

use crate::config::ShellConfig;
use crate::remote::{RemoteFs, SandboxFs};
use alias::AliasTable;
use history::HistoryManager;
use parser::CommandLine;
use path::{PathResolver, VirtualPath};
use registry::{CommandContext, CommandRegistry};
use variables::ShellVariables;

/// Status for a line that failed to tokenize
pub const EXIT_SYNTAX: i32 = 2;

/// Interactive commands running at least this long get a timing note
pub const SLOW_COMMAND: Duration = Duration::from_millis(500);

/// `Command executed in 1.234 seconds` for slow commands.
pub fn timing_note(elapsed: Duration) -> Option<String> {
    (elapsed >= SLOW_COMMAND)
        .then(|| format!("Command executed in {:.3} seconds", elapsed.as_secs_f64()))
}

/// Main shell state
pub struct Shell {
    /// Virtual working directory on the remote side
    pub cwd: VirtualPath,
    /// Last command exit status
    pub last_status: i32,
    /// Set by `exit`; the session ends with this status
    pub exit_code: Option<i32>,
    pub history: HistoryManager,
    pub commands: CommandRegistry,
    pub aliases: AliasTable,
    pub variables: ShellVariables,
    remote: Rc<dyn RemoteFs>,
    resolver: PathResolver,
}

impl Shell {
    /// Shell over `remote` with the builtins registered. Starts in `home`
    /// when it is a directory, otherwise at the root.
    pub fn new(remote: Rc<dyn RemoteFs>, home: VirtualPath, history: HistoryManager) -> Self {
        let mut commands = CommandRegistry::new();
        builtin::register_builtins(&mut commands);

        let cwd = if remote.is_dir(&home) { home.clone() } else { VirtualPath::root() };
        let mut variables = ShellVariables::new();
        variables.set("HOME", home.as_str());
        Self {
            cwd,
            last_status: 0,
            exit_code: None,
            history,
            commands,
            aliases: AliasTable::with_defaults(),
            variables,
            remote,
            resolver: PathResolver::new(home),
        }
    }

    /// Shell over a sandbox directory as described by `config`.
    pub fn from_config(config: &ShellConfig) -> Result<Self> {
        let remote = SandboxFs::new(config.root_dir()?)?;
        let history = HistoryManager::new(config.history_size, config.history_file.clone());
        let mut shell = Self::new(Rc::new(remote), VirtualPath::new(&config.home), history);
        for (name, value) in &config.aliases {
            shell.aliases.set(name, value)?;
        }
        Ok(shell)
    }

    pub fn remote(&self) -> Rc<dyn RemoteFs> {
        Rc::clone(&self.remote)
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn should_exit(&self) -> bool {
        self.exit_code.is_some()
    }

    /// Execute a line against stdout and stderr.
    pub fn execute(&mut self, line: &str) -> i32 {
        let stdout = io::stdout();
        let stderr = io::stderr();
        let mut out = stdout.lock();
        let mut err = stderr.lock();
        self.execute_with_io(line, &mut out, &mut err)
    }

    /// Execute a line, recording it in history.
    pub fn execute_with_io(&mut self, line: &str, out: &mut dyn Write, err: &mut dyn Write) -> i32 {
        self.run_line(line, true, out, err)
    }

    /// Execute a line without recording it (startup file replay).
    pub fn execute_unrecorded(&mut self, line: &str, out: &mut dyn Write, err: &mut dyn Write) -> i32 {
        self.run_line(line, false, out, err)
    }

    /// expand history -> record -> split chain, then per command:
    /// alias -> variables -> tokenize -> assign or glob -> dispatch
    fn run_line(&mut self, line: &str, record: bool, out: &mut dyn Write, err: &mut dyn Write) -> i32 {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return self.last_status;
        }

        let expanded = match expansion::expand(line, &self.history) {
            Ok(expanded) => expanded,
            Err(e) => {
                let _ = writeln!(err, "remsh: history expansion: {}", e);
                return self.finish(1);
            }
        };
        if expanded != line {
            log::debug!("history expansion {:?} -> {:?}", line, expanded);
            let _ = writeln!(out, "{}", expanded);
        }

        if record {
            self.history.add_command(&expanded);
        }

        let segments = match parser::split_chain(&expanded) {
            Ok(segments) => segments,
            Err(e) => {
                let _ = writeln!(err, "remsh: syntax error: {}", e);
                return self.finish(EXIT_SYNTAX);
            }
        };

        for segment in segments {
            if !segment.connector.should_run(self.last_status) {
                log::debug!("skipping {:?} after status {}", segment.text, self.last_status);
                continue;
            }
            let code = self.run_command(&segment.text, out, err);
            self.finish(code);
            if self.should_exit() {
                break;
            }
        }
        self.last_status
    }

    /// Run one command of a chain and return its status.
    fn run_command(&mut self, text: &str, out: &mut dyn Write, err: &mut dyn Write) -> i32 {
        let aliased = self.aliases.expand(text);
        let source = self.expand_variables(&aliased);

        let mut command = match CommandLine::parse(&source) {
            Ok(Some(command)) => command,
            Ok(None) => return 0,
            Err(e) => {
                let _ = writeln!(err, "remsh: syntax error: {}", e);
                return EXIT_SYNTAX;
            }
        };

        if command.args.is_empty() {
            if let Some((name, value)) = variables::assignment(&source, &command.name) {
                log::debug!("set {}={:?}", name, value);
                self.variables.set(name, value);
                return 0;
            }
        }

        if let Err(e) = command.expand(&self.cwd, &self.resolver, &*self.remote) {
            let _ = writeln!(err, "remsh: {}", e);
            return 1;
        }

        let mut ctx = CommandContext {
            remote: &*self.remote,
            resolver: &self.resolver,
            cwd: &mut self.cwd,
            history: &mut self.history,
            commands: &self.commands,
            aliases: &mut self.aliases,
            variables: &mut self.variables,
            exit: &mut self.exit_code,
            out,
            err,
        };
        self.commands.dispatch(&command.name, &command.args, &mut ctx)
    }

    /// `$?` and `$PWD` come from shell state, everything else from the table.
    fn expand_variables(&self, text: &str) -> String {
        variables::expand(text, |name| match name {
            "?" => Some(self.last_status.to_string()),
            "PWD" => Some(self.cwd.to_string()),
            _ => self.variables.get(name).map(str::to_string),
        })
    }

    fn finish(&mut self, code: i32) -> i32 {
        self.last_status = code;
        code
    }

    /// Get prompt string
    pub fn prompt(&self) -> String {
        let status = if self.last_status == 0 {
            "✔".green().to_string()
        } else {
            "✖".red().to_string()
        };
        format!(
            "{} {} {}> ",
            status,
            "remsh".bright_cyan().bold(),
            self.resolver.display(&self.cwd).white()
        )
    }

    /// Flush history before the process ends.
    pub fn shutdown(&mut self) {
        self.history.persist();
        log::info!("session ended with status {}", self.exit_code.unwrap_or(self.last_status));
    }
}
