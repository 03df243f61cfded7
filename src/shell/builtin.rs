//! Built-in commands
//!
//! A small working set behind the same [`Command`] interface every other
//! command uses. All path arguments go through the context's resolver, and
//! all file access goes through the remote API.

use std::io::Write;
use std::time::SystemTime;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use super::registry::{Command, CommandContext, CommandRegistry};
use super::variables::is_valid_name;
use crate::remote::{FileInfo, FileKind, RemoteError};

const NAVIGATION: &str = "Navigation";
const FILES: &str = "Files";
const SHELL: &str = "Shell";

/// Register every builtin into `registry`.
pub fn register_builtins(registry: &mut CommandRegistry) {
    registry.register(Box::new(Cd));
    registry.register(Box::new(Pwd));
    registry.register(Box::new(Ls));
    registry.register(Box::new(Cat));
    registry.register(Box::new(Echo));
    registry.register(Box::new(Touch));
    registry.register(Box::new(Stat));
    registry.register(Box::new(History));
    registry.register(Box::new(Alias));
    registry.register(Box::new(Unalias));
    registry.register(Box::new(Set));
    registry.register(Box::new(Unset));
    registry.register(Box::new(Help));
    registry.register(Box::new(Exit("exit")));
    registry.register(Box::new(Exit("quit")));
}

fn format_time(time: Option<SystemTime>) -> String {
    time.map(|t| {
        let datetime: chrono::DateTime<chrono::Local> = t.into();
        datetime.format("%Y-%m-%d %H:%M").to_string()
    })
    .unwrap_or_else(|| "????-??-?? ??:??".to_string())
}

fn styled_name(name: &str, kind: FileKind) -> String {
    match kind {
        FileKind::Directory => name.blue().bold().to_string(),
        FileKind::Symlink => name.cyan().to_string(),
        _ => name.to_string(),
    }
}

/// Split leading single-letter flags (`-al`) from operands.
fn split_flags<'a>(args: &'a [String], allowed: &str) -> Result<(Vec<char>, Vec<&'a str>)> {
    let mut flags = Vec::new();
    let mut operands = Vec::new();
    for arg in args {
        match arg.strip_prefix('-') {
            Some(letters) if !letters.is_empty() && operands.is_empty() => {
                for c in letters.chars() {
                    if !allowed.contains(c) {
                        bail!("invalid option -- '{}'", c);
                    }
                    flags.push(c);
                }
            }
            _ => operands.push(arg.as_str()),
        }
    }
    Ok((flags, operands))
}

/// cd - change the virtual working directory
struct Cd;

impl Command for Cd {
    fn name(&self) -> &'static str {
        "cd"
    }
    fn category(&self) -> &'static str {
        NAVIGATION
    }
    fn summary(&self) -> &'static str {
        "Change directory (home when omitted)"
    }
    fn usage(&self) -> &'static str {
        "cd [dir]"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<i32> {
        if args.len() > 1 {
            bail!("too many arguments");
        }
        let target = match args.first() {
            Some(dir) => ctx.resolve(dir),
            None => ctx.resolver.home().clone(),
        };

        // listing proves the target is a directory we can enter
        ctx.remote.list_entries(&target)?;
        *ctx.cwd = target;
        Ok(0)
    }
}

/// pwd - print working directory
struct Pwd;

impl Command for Pwd {
    fn name(&self) -> &'static str {
        "pwd"
    }
    fn category(&self) -> &'static str {
        NAVIGATION
    }
    fn summary(&self) -> &'static str {
        "Print working directory"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, _args: &[String]) -> Result<i32> {
        writeln!(ctx.out, "{}", ctx.cwd)?;
        Ok(0)
    }
}

/// ls - list directory contents
struct Ls;

impl Ls {
    fn write_entry(
        ctx: &mut CommandContext<'_>,
        info: &FileInfo,
        label: &str,
        long: bool,
    ) -> Result<()> {
        let name = styled_name(label, info.kind);
        if long {
            writeln!(
                ctx.out,
                "{} {:>10} {} {}",
                info.kind.marker(),
                info.size,
                format_time(info.modified),
                name
            )?;
        } else {
            writeln!(ctx.out, "{}", name)?;
        }
        Ok(())
    }

    fn list_dir(
        ctx: &mut CommandContext<'_>,
        operand: &str,
        show_all: bool,
        long: bool,
    ) -> Result<()> {
        let dir = ctx.resolve(operand);
        let info = ctx.remote.stat(&dir)?;
        if !info.is_dir() {
            return Self::write_entry(ctx, &info, operand, long);
        }

        let mut names = ctx.remote.list_entries(&dir)?;
        names.retain(|n| show_all || !n.starts_with('.'));
        names.sort();

        for name in names {
            let path = dir.join(&name);
            let info = match ctx.remote.stat(&path) {
                Ok(info) => info,
                // entry vanished or is unreadable; still show its name
                Err(_) => FileInfo { name: name.clone(), kind: FileKind::Other, size: 0, modified: None },
            };
            Self::write_entry(ctx, &info, &name, long)?;
        }
        Ok(())
    }
}

impl Command for Ls {
    fn name(&self) -> &'static str {
        "ls"
    }
    fn category(&self) -> &'static str {
        NAVIGATION
    }
    fn summary(&self) -> &'static str {
        "List directory contents (-a all, -l long format)"
    }
    fn usage(&self) -> &'static str {
        "ls [-a] [-l] [path...]"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<i32> {
        let (flags, mut operands) = split_flags(args, "al")?;
        let show_all = flags.contains(&'a');
        let long = flags.contains(&'l');
        if operands.is_empty() {
            operands.push("");
        }

        let headers = operands.len() > 1;
        let mut status = 0;
        for (i, operand) in operands.iter().enumerate() {
            if headers {
                if i > 0 {
                    writeln!(ctx.out)?;
                }
                writeln!(ctx.out, "{}:", operand)?;
            }
            if let Err(e) = Self::list_dir(ctx, operand, show_all, long) {
                // a failing operand is reported; a failing sink ends the command
                let Some(remote) = e.downcast_ref::<RemoteError>() else {
                    return Err(e);
                };
                writeln!(ctx.err, "ls: {}", remote)?;
                status = 1;
            }
        }
        Ok(status)
    }
}

/// cat - print file contents
struct Cat;

impl Command for Cat {
    fn name(&self) -> &'static str {
        "cat"
    }
    fn category(&self) -> &'static str {
        FILES
    }
    fn summary(&self) -> &'static str {
        "Print file contents"
    }
    fn usage(&self) -> &'static str {
        "cat path..."
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<i32> {
        if args.is_empty() {
            bail!("missing file operand");
        }
        let mut status = 0;
        for arg in args {
            let path = ctx.resolve(arg);
            match ctx.remote.read(&path) {
                Ok(data) => ctx.out.write_all(&data)?,
                Err(e) => {
                    writeln!(ctx.err, "cat: {}", e)?;
                    status = 1;
                }
            }
        }
        ctx.out.flush()?;
        Ok(status)
    }
}

/// echo - print arguments
struct Echo;

impl Command for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }
    fn category(&self) -> &'static str {
        SHELL
    }
    fn summary(&self) -> &'static str {
        "Print arguments (-n: no trailing newline)"
    }
    fn usage(&self) -> &'static str {
        "echo [-n] args..."
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<i32> {
        let (newline, words) = match args.first().map(String::as_str) {
            Some("-n") => (false, &args[1..]),
            _ => (true, args),
        };
        write!(ctx.out, "{}", words.join(" "))?;
        if newline {
            writeln!(ctx.out)?;
        }
        Ok(0)
    }
}

/// touch - create empty files
struct Touch;

impl Command for Touch {
    fn name(&self) -> &'static str {
        "touch"
    }
    fn category(&self) -> &'static str {
        FILES
    }
    fn summary(&self) -> &'static str {
        "Create empty files that do not exist"
    }
    fn usage(&self) -> &'static str {
        "touch path..."
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<i32> {
        if args.is_empty() {
            bail!("missing file operand");
        }
        for arg in args {
            let path = ctx.resolve(arg);
            if ctx.remote.exists(&path) {
                continue;
            }
            ctx.remote
                .write(&path, &[])
                .with_context(|| format!("cannot touch '{}'", arg))?;
        }
        Ok(0)
    }
}

/// stat - show entry metadata
struct Stat;

impl Command for Stat {
    fn name(&self) -> &'static str {
        "stat"
    }
    fn category(&self) -> &'static str {
        FILES
    }
    fn summary(&self) -> &'static str {
        "Show file type, size and modification time"
    }
    fn usage(&self) -> &'static str {
        "stat path..."
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<i32> {
        if args.is_empty() {
            bail!("missing operand");
        }
        let mut status = 0;
        for arg in args {
            let path = ctx.resolve(arg);
            let info = match ctx.remote.stat(&path) {
                Ok(info) => info,
                Err(e) => {
                    writeln!(ctx.err, "stat: {}", e)?;
                    status = 1;
                    continue;
                }
            };
            let kind = match info.kind {
                FileKind::File => "regular file",
                FileKind::Directory => "directory",
                FileKind::Symlink => "symbolic link",
                FileKind::Other => "other",
            };
            writeln!(ctx.out, "  File: {}", path)?;
            writeln!(ctx.out, "  Type: {}", kind)?;
            writeln!(ctx.out, "  Size: {}", info.size)?;
            writeln!(ctx.out, "Modify: {}", format_time(info.modified))?;
        }
        Ok(status)
    }
}

/// history - list, search, clear or summarize command history
struct History;

impl Command for History {
    fn name(&self) -> &'static str {
        "history"
    }
    fn category(&self) -> &'static str {
        SHELL
    }
    fn summary(&self) -> &'static str {
        "Show history; N last entries, -c clear, -s stats, or search a pattern"
    }
    fn usage(&self) -> &'static str {
        "history [N | -c | -s | pattern]"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<i32> {
        match args.first().map(String::as_str) {
            None => {
                for (n, text) in ctx.history.get_numbered_history(1, None) {
                    writeln!(ctx.out, "{:>5}  {}", n, text)?;
                }
                Ok(0)
            }
            Some("-c") => {
                ctx.history.clear_history();
                writeln!(ctx.out, "History cleared")?;
                Ok(0)
            }
            Some("-s") => {
                let stats = ctx.history.get_stats();
                writeln!(ctx.out, "Total commands:  {}", stats.total)?;
                writeln!(ctx.out, "Unique commands: {}", stats.unique)?;
                match stats.most_used {
                    Some((text, count)) => writeln!(ctx.out, "Most used:       {} ({} times)", text, count)?,
                    None => writeln!(ctx.out, "Most used:       -")?,
                }
                match stats.file {
                    Some(file) => writeln!(ctx.out, "History file:    {}", file.display())?,
                    None => writeln!(ctx.out, "History file:    (not saved)")?,
                }
                Ok(0)
            }
            Some(first) => {
                if let Ok(count) = first.parse::<usize>() {
                    let start = ctx.history.len().saturating_sub(count) + 1;
                    for (n, text) in ctx.history.get_numbered_history(start, Some(count)) {
                        writeln!(ctx.out, "{:>5}  {}", n, text)?;
                    }
                    return Ok(0);
                }

                let pattern = args.join(" ");
                let found = ctx.history.search_history(&pattern);
                if found.is_empty() {
                    writeln!(ctx.err, "history: no commands matching '{}'", pattern)?;
                    return Ok(1);
                }
                for text in found {
                    writeln!(ctx.out, "{}", text)?;
                }
                Ok(0)
            }
        }
    }
}

fn escape_single_quotes(value: &str) -> String {
    value.replace('\'', r#"'\''"#)
}

/// alias - define or show aliases
struct Alias;

impl Command for Alias {
    fn name(&self) -> &'static str {
        "alias"
    }
    fn category(&self) -> &'static str {
        SHELL
    }
    fn summary(&self) -> &'static str {
        "Define or show aliases"
    }
    fn usage(&self) -> &'static str {
        "alias [name[=value]...]"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<i32> {
        if args.is_empty() {
            for (name, value) in ctx.aliases.sorted() {
                writeln!(ctx.out, "alias {}='{}'", name, escape_single_quotes(value))?;
            }
            return Ok(0);
        }

        let mut status = 0;
        for arg in args {
            if let Some((name, value)) = arg.split_once('=') {
                ctx.aliases.set(name, value)?;
            } else if let Some(value) = ctx.aliases.get(arg) {
                writeln!(ctx.out, "alias {}='{}'", arg, escape_single_quotes(value))?;
            } else {
                writeln!(ctx.err, "alias: {}: not found", arg)?;
                status = 1;
            }
        }
        Ok(status)
    }
}

/// unalias - remove aliases
struct Unalias;

impl Command for Unalias {
    fn name(&self) -> &'static str {
        "unalias"
    }
    fn category(&self) -> &'static str {
        SHELL
    }
    fn summary(&self) -> &'static str {
        "Remove aliases (-a: all of them)"
    }
    fn usage(&self) -> &'static str {
        "unalias [-a] name..."
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<i32> {
        if args.is_empty() {
            bail!("missing operand");
        }
        if args.iter().any(|a| a == "-a") {
            ctx.aliases.clear();
            return Ok(0);
        }

        let mut status = 0;
        for name in args {
            if !ctx.aliases.remove(name) {
                writeln!(ctx.err, "unalias: {}: not found", name)?;
                status = 1;
            }
        }
        Ok(status)
    }
}

/// set - list shell variables
struct Set;

impl Command for Set {
    fn name(&self) -> &'static str {
        "set"
    }
    fn category(&self) -> &'static str {
        SHELL
    }
    fn summary(&self) -> &'static str {
        "List shell variables (assign with NAME=value)"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<i32> {
        if !args.is_empty() {
            bail!("options are not supported; assign with NAME=value");
        }
        for (name, value) in ctx.variables.sorted() {
            writeln!(ctx.out, "{}='{}'", name, escape_single_quotes(value))?;
        }
        Ok(0)
    }
}

/// unset - remove shell variables
struct Unset;

impl Command for Unset {
    fn name(&self) -> &'static str {
        "unset"
    }
    fn category(&self) -> &'static str {
        SHELL
    }
    fn summary(&self) -> &'static str {
        "Remove shell variables"
    }
    fn usage(&self) -> &'static str {
        "unset name..."
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<i32> {
        for name in args {
            if !is_valid_name(name) {
                bail!("`{}': not a valid identifier", name);
            }
            ctx.variables.unset(name);
        }
        Ok(0)
    }
}

/// help - list commands or show one command's help
struct Help;

impl Command for Help {
    fn name(&self) -> &'static str {
        "help"
    }
    fn category(&self) -> &'static str {
        SHELL
    }
    fn summary(&self) -> &'static str {
        "List commands, or show help for one command"
    }
    fn usage(&self) -> &'static str {
        "help [command]"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<i32> {
        if let Some(topic) = args.first() {
            let Some(command) = ctx.commands.get(topic) else {
                bail!("no help topic for '{}'", topic);
            };
            command.show_help(ctx.out)?;
            return Ok(0);
        }

        writeln!(ctx.out, "{}", "remsh - shell for a remote sandbox".bold())?;
        for (category, commands) in ctx.commands.by_category() {
            writeln!(ctx.out)?;
            writeln!(ctx.out, "{}:", category.bold())?;
            for command in commands {
                writeln!(
                    ctx.out,
                    "  {} {}",
                    format!("{:<10}", command.name()).green(),
                    command.summary()
                )?;
            }
        }
        writeln!(ctx.out)?;
        writeln!(ctx.out, "History:   !! last command, !N command N, !prefix, ^old^new")?;
        writeln!(ctx.out, "Chaining:  cmd1; cmd2   cmd1 && cmd2   cmd1 || cmd2")?;
        writeln!(ctx.out, "Variables: NAME=value, $NAME, ${{NAME}}, $?")?;
        writeln!(ctx.out, "Type '<command> --help' for details.")?;
        Ok(0)
    }
}

/// exit / quit - leave the shell
struct Exit(&'static str);

impl Command for Exit {
    fn name(&self) -> &'static str {
        self.0
    }
    fn category(&self) -> &'static str {
        SHELL
    }
    fn summary(&self) -> &'static str {
        "Exit the shell with an optional status"
    }
    fn usage(&self) -> &'static str {
        "exit [code]"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<i32> {
        let code = match args.first() {
            Some(arg) => arg
                .parse::<i32>()
                .with_context(|| format!("{}: numeric argument required", arg))?,
            None => 0,
        };
        *ctx.exit = Some(code);
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::remote::{MemoryFs, RemoteFs};
    use crate::shell::history::HistoryManager;
    use crate::shell::path::VirtualPath;
    use crate::shell::Shell;

    fn setup() -> (Rc<MemoryFs>, Shell) {
        colored::control::set_override(false);
        let fs = Rc::new(MemoryFs::new());
        fs.add_dir("/root/docs")
            .add_file("/root/a.txt", b"alpha\n")
            .add_file("/root/b.txt", b"beta\n")
            .add_file("/root/.secret", b"")
            .add_file("/etc/hosts", b"127.0.0.1 localhost\n");
        let shell = Shell::new(fs.clone(), VirtualPath::new("/root"), HistoryManager::in_memory(100));
        (fs, shell)
    }

    fn run(shell: &mut Shell, line: &str) -> (i32, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = shell.execute_with_io(line, &mut out, &mut err);
        (code, String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    #[test]
    fn test_cd_and_pwd() {
        let (_fs, mut shell) = setup();
        assert_eq!(run(&mut shell, "pwd").1, "/root\n");
        assert_eq!(run(&mut shell, "cd /etc").0, 0);
        assert_eq!(run(&mut shell, "pwd").1, "/etc\n");
        assert_eq!(run(&mut shell, "cd ..").0, 0);
        assert_eq!(run(&mut shell, "pwd").1, "/\n");
        assert_eq!(run(&mut shell, "cd").0, 0);
        assert_eq!(run(&mut shell, "pwd").1, "/root\n");
    }

    #[test]
    fn test_cd_failures_keep_cwd() {
        let (_fs, mut shell) = setup();
        let (code, _, err) = run(&mut shell, "cd /nowhere");
        assert_eq!(code, 1);
        assert_eq!(err, "cd: /nowhere: no such file or directory\n");
        let (code, _, err) = run(&mut shell, "cd a.txt");
        assert_eq!(code, 1);
        assert!(err.contains("not a directory"));
        assert_eq!(shell.cwd.as_str(), "/root");
    }

    #[test]
    fn test_ls_hides_dotfiles() {
        let (_fs, mut shell) = setup();
        assert_eq!(run(&mut shell, "ls").1, "a.txt\nb.txt\ndocs\n");
        assert_eq!(run(&mut shell, "ls -a").1, ".secret\na.txt\nb.txt\ndocs\n");
    }

    #[test]
    fn test_ls_long_and_errors() {
        let (_fs, mut shell) = setup();
        let (code, out, _) = run(&mut shell, "ls -l /etc");
        assert_eq!(code, 0);
        assert!(out.starts_with("- "));
        assert!(out.trim_end().ends_with(" hosts"));
        assert!(out.contains(" 20 "));

        let (code, _, err) = run(&mut shell, "ls /missing");
        assert_eq!(code, 1);
        assert_eq!(err, "ls: /missing: no such file or directory\n");

        let (code, _, err) = run(&mut shell, "ls -z");
        assert_eq!(code, 1);
        assert!(err.contains("invalid option"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_ls_output_failure_is_an_error() {
        let (_fs, mut shell) = setup();
        let mut err = Vec::new();
        let code = shell.execute_with_io("ls", &mut ClosedPipe, &mut err);
        assert_eq!(code, 1);
        let err = String::from_utf8(err).unwrap();
        assert_eq!(err.lines().count(), 1);
        assert!(err.starts_with("ls: "));
        assert!(!err.contains("no such file"));
    }

    #[test]
    fn test_ls_multiple_operands() {
        let (_fs, mut shell) = setup();
        let (_, out, _) = run(&mut shell, "ls docs /etc");
        assert_eq!(out, "docs:\n\n/etc:\nhosts\n");
        assert_eq!(run(&mut shell, "ls a.txt").1, "a.txt\n");
    }

    #[test]
    fn test_cat_with_glob() {
        let (_fs, mut shell) = setup();
        let (code, out, _) = run(&mut shell, "cat *.txt");
        assert_eq!(code, 0);
        assert_eq!(out, "alpha\nbeta\n");

        let (code, out, err) = run(&mut shell, "cat a.txt nope");
        assert_eq!(code, 1);
        assert_eq!(out, "alpha\n");
        assert!(err.contains("nope: no such file or directory"));
    }

    #[test]
    fn test_quoted_whitespace_is_kept_in_names() {
        let (fs, mut shell) = setup();
        let (code, _, err) = run(&mut shell, "cat \" a.txt\"");
        assert_eq!(code, 1);
        assert_eq!(err, "cat: /root/ a.txt: no such file or directory\n");

        assert_eq!(run(&mut shell, "touch 'b '").0, 0);
        assert!(fs.exists(&VirtualPath::new("/root/b ")));
        assert!(!fs.exists(&VirtualPath::new("/root/b")));

        assert_eq!(run(&mut shell, "cd ' '").0, 1);
        assert_eq!(shell.cwd.as_str(), "/root");
    }

    #[test]
    fn test_echo() {
        let (_fs, mut shell) = setup();
        assert_eq!(run(&mut shell, "echo 'a  b' c").1, "a  b c\n");
        assert_eq!(run(&mut shell, "echo -n hi").1, "hi");
        assert_eq!(run(&mut shell, "echo '*.txt'").1, "*.txt\n");
    }

    #[test]
    fn test_touch_creates_missing_files() {
        let (fs, mut shell) = setup();
        assert_eq!(run(&mut shell, "touch new.txt a.txt").0, 0);
        assert_eq!(fs.read(&VirtualPath::new("/root/new.txt")).unwrap(), b"");
        // existing content untouched
        assert_eq!(fs.read(&VirtualPath::new("/root/a.txt")).unwrap(), b"alpha\n");
        assert_eq!(run(&mut shell, "touch /nowhere/x").0, 1);
    }

    #[test]
    fn test_stat() {
        let (_fs, mut shell) = setup();
        let (code, out, _) = run(&mut shell, "stat docs");
        assert_eq!(code, 0);
        assert!(out.contains("  File: /root/docs\n"));
        assert!(out.contains("  Type: directory\n"));
        assert_eq!(run(&mut shell, "stat ghost").0, 1);
    }

    #[test]
    fn test_history_listing_and_search() {
        let (_fs, mut shell) = setup();
        run(&mut shell, "pwd");
        run(&mut shell, "echo One");
        run(&mut shell, "echo two");

        let (_, out, _) = run(&mut shell, "history");
        assert_eq!(out, "    1  pwd\n    2  echo One\n    3  echo two\n");
        let (_, out, _) = run(&mut shell, "history 2");
        assert_eq!(out, "    2  echo One\n    3  echo two\n");
        let (_, out, _) = run(&mut shell, "history ONE");
        assert_eq!(out, "echo One\n");
        assert_eq!(run(&mut shell, "history zzz").0, 1);
    }

    #[test]
    fn test_history_stats_and_clear() {
        let (_fs, mut shell) = setup();
        run(&mut shell, "pwd");
        run(&mut shell, "ls");
        run(&mut shell, "pwd");
        let (_, out, _) = run(&mut shell, "history -s");
        assert!(out.contains("Total commands:  3"));
        assert!(out.contains("Most used:       pwd (2 times)"));

        assert_eq!(run(&mut shell, "history -c").1, "History cleared\n");
        assert!(shell.history.is_empty());
    }

    #[test]
    fn test_alias_define_use_and_list() {
        let (_fs, mut shell) = setup();
        assert_eq!(run(&mut shell, "alias greet='echo hello'").0, 0);
        assert_eq!(run(&mut shell, "greet world").1, "hello world\n");
        assert_eq!(run(&mut shell, "alias greet").1, "alias greet='echo hello'\n");

        run(&mut shell, "alias it=\"echo it's\"");
        assert_eq!(run(&mut shell, "alias it").1, "alias it='echo it'\\''s'\n");

        let (code, _, err) = run(&mut shell, "alias nosuch");
        assert_eq!(code, 1);
        assert_eq!(err, "alias: nosuch: not found\n");
        assert_eq!(run(&mut shell, "alias 'a b=ls'").0, 1);

        let (_, out, _) = run(&mut shell, "alias");
        assert!(out.contains("alias ll='ls -l -a'\n"));
    }

    #[test]
    fn test_default_aliases() {
        let (_fs, mut shell) = setup();
        assert_eq!(run(&mut shell, "la").1, ".secret\na.txt\nb.txt\ndocs\n");
        assert_eq!(run(&mut shell, "q 5").0, 5);
        assert_eq!(shell.exit_code, Some(5));
    }

    #[test]
    fn test_unalias() {
        let (_fs, mut shell) = setup();
        assert_eq!(run(&mut shell, "unalias l").0, 0);
        assert_eq!(run(&mut shell, "l").0, 127);
        let (code, _, err) = run(&mut shell, "unalias l");
        assert_eq!(code, 1);
        assert_eq!(err, "unalias: l: not found\n");

        assert_eq!(run(&mut shell, "unalias -a").0, 0);
        assert!(shell.aliases.sorted().is_empty());
        assert_eq!(run(&mut shell, "unalias").0, 1);
    }

    #[test]
    fn test_set_and_unset() {
        let (_fs, mut shell) = setup();
        run(&mut shell, "GREETING='hi there'");
        let (_, out, _) = run(&mut shell, "set");
        assert!(out.contains("GREETING='hi there'\n"));
        assert!(out.contains("HOME='/root'\n"));

        assert_eq!(run(&mut shell, "unset GREETING NEVER_SET").0, 0);
        assert!(shell.variables.get("GREETING").is_none());
        assert_eq!(run(&mut shell, "unset 1bad").0, 1);
        assert_eq!(run(&mut shell, "set -x").0, 1);
    }

    #[test]
    fn test_help() {
        let (_fs, mut shell) = setup();
        let (code, out, _) = run(&mut shell, "help");
        assert_eq!(code, 0);
        assert!(out.contains("Navigation:"));
        assert!(out.contains("ls"));

        let (_, out, _) = run(&mut shell, "help cat");
        assert!(out.contains("cat path..."));
        assert_eq!(run(&mut shell, "help bogus").0, 1);
        assert!(run(&mut shell, "ls --help").1.contains("ls [-a] [-l]"));
    }

    #[test]
    fn test_exit_and_quit() {
        let (_fs, mut shell) = setup();
        assert_eq!(run(&mut shell, "exit 3").0, 3);
        assert_eq!(shell.exit_code, Some(3));

        let (_fs, mut shell) = setup();
        assert_eq!(run(&mut shell, "quit").0, 0);
        assert_eq!(shell.exit_code, Some(0));

        let (_fs, mut shell) = setup();
        assert_eq!(run(&mut shell, "exit abc").0, 1);
        assert_eq!(shell.exit_code, None);
    }
}
