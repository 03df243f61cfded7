//! remsh - interactive shell for a remote sandboxed environment
//!
//! Features:
//! - Quote and escape aware tokenizer
//! - Wildcards expanded against the remote directory listing
//! - Virtual working directory, never the host's
//! - History recall and substitution (`!!`, `!N`, `!prefix`, `^old^new`)

pub mod config;
pub mod remote;
pub mod shell;

pub use config::ShellConfig;
pub use shell::Shell;
