//! remsh - shell for a remote sandboxed environment
//!
//! Usage:
//!   remsh                      Interactive shell
//!   remsh -c "command"         Execute single command
//!   remsh script.remsh         Execute script file

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use remsh::shell::completer::RemshHelper;
use remsh::shell::timing_note;
use remsh::{Shell, ShellConfig};

#[derive(Parser, Debug)]
#[command(name = "remsh", author, version, about = "Interactive shell for a remote sandboxed environment")]
struct Cli {
    /// Execute a single command and exit with its status
    #[arg(short = 'c', value_name = "COMMAND")]
    command: Option<String>,

    /// Script file to execute, one command per line
    script: Option<PathBuf>,

    /// Host directory served as the remote root
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Remote home directory
    #[arg(long, value_name = "PATH")]
    home: Option<String>,

    /// History file
    #[arg(long, value_name = "PATH")]
    history_file: Option<PathBuf>,

    /// Maximum number of history entries kept
    #[arg(long, value_name = "N")]
    history_size: Option<usize>,

    /// Keep history in memory only
    #[arg(long)]
    no_history: bool,

    /// Configuration file (default: <config dir>/remsh/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    /// Flags override the file configuration.
    fn apply(&self, config: &mut ShellConfig) {
        if let Some(root) = &self.root {
            config.root = Some(root.clone());
        }
        if let Some(home) = &self.home {
            config.home = home.clone();
        }
        if let Some(file) = &self.history_file {
            config.history_file = Some(file.clone());
        }
        if let Some(size) = self.history_size {
            config.history_size = size;
        }
        if self.no_history {
            config.history_file = None;
        }
        if self.no_color {
            config.color = false;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut config = ShellConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    if !config.color {
        colored::control::set_override(false);
    }

    let mut shell = Shell::from_config(&config)?;
    log::info!("session started, home {}", config.home);
    load_remshrc(&mut shell, &config);

    let code = if shell.should_exit() {
        shell.exit_code.unwrap_or(0)
    } else if let Some(command) = &cli.command {
        execute_command(&mut shell, command)
    } else if let Some(script) = &cli.script {
        execute_script(&mut shell, script)?
    } else {
        run_repl(&mut shell)?
    };

    shell.shutdown();
    std::process::exit(code);
}

/// Run a line against stdout/stderr without recording it in history.
fn run_unrecorded(shell: &mut Shell, line: &str) -> i32 {
    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();
    shell.execute_unrecorded(line, &mut out, &mut err)
}

fn load_remshrc(shell: &mut Shell, config: &ShellConfig) {
    let Some(path) = &config.rc_file else {
        return;
    };
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return,
        Err(e) => {
            log::warn!("cannot read {}: {}", path.display(), e);
            return;
        }
    };

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        run_unrecorded(shell, line);
        if shell.should_exit() {
            break;
        }
    }
}

fn final_status(shell: &Shell) -> i32 {
    shell.exit_code.unwrap_or(shell.last_status)
}

fn execute_command(shell: &mut Shell, command: &str) -> i32 {
    run_unrecorded(shell, command);
    final_status(shell)
}

fn execute_script(shell: &mut Shell, path: &Path) -> Result<i32> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read script {}", path.display()))?;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        run_unrecorded(shell, line);
        if shell.should_exit() {
            break;
        }
    }
    Ok(final_status(shell))
}

fn print_banner(shell: &Shell) {
    println!(
        "{} {} {}",
        "remsh".bright_cyan().bold(),
        env!("CARGO_PKG_VERSION").bright_black(),
        "- shell for a remote sandbox".white()
    );
    println!(
        "  home {}, {} history entries",
        shell.resolver().home().to_string().cyan(),
        shell.history.len()
    );
    println!("  {} lists commands, {} leaves", "help".green(), "exit".green());
    println!();
}

fn run_repl(shell: &mut Shell) -> Result<i32> {
    print_banner(shell);

    let mut commands: Vec<String> = shell.commands.names().into_iter().map(str::to_string).collect();
    commands.extend(shell.aliases.names().map(str::to_string));
    commands.sort();
    commands.dedup();
    let helper = RemshHelper::new(commands, shell.remote(), shell.resolver().clone(), shell.cwd.clone());
    let mut editor: Editor<RemshHelper, DefaultHistory> =
        Editor::new().context("cannot initialize line editor")?;
    editor.set_helper(Some(helper));

    // arrow keys recall what the history file already holds
    for text in shell.history.get_history(None) {
        let _ = editor.add_history_entry(text);
    }

    loop {
        if let Some(helper) = editor.helper_mut() {
            helper.set_cwd(shell.cwd.clone());
        }

        match editor.readline(&shell.prompt()) {
            Ok(line) => {
                let before = shell.history.latest().map(str::to_string);
                let started = Instant::now();
                shell.execute(&line);
                if let Some(note) = timing_note(started.elapsed()) {
                    eprintln!("{}", note.dimmed());
                }
                if let Some(latest) = shell.history.latest() {
                    if before.as_deref() != Some(latest) {
                        let _ = editor.add_history_entry(latest);
                    }
                }
                shell.history.reset_cursor();
                if shell.should_exit() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(e) => {
                eprintln!("remsh: input error: {}", e);
                break;
            }
        }
    }

    println!("Goodbye!");
    Ok(final_status(shell))
}
