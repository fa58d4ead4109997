use crate::utils::cache::Caches;
use crate::utils::debug_with_context;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tokio::task;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Zsh,
    Bash,
    Fish,
    Pwsh,
    Elvish,
    Nu,
    Cmd,
    Generic,
}

impl Shell {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "zsh" => Shell::Zsh,
            "bash" => Shell::Bash,
            "fish" => Shell::Fish,
            "pwsh" | "powershell" => Shell::Pwsh,
            "elvish" => Shell::Elvish,
            "nu" => Shell::Nu,
            "cmd" => Shell::Cmd,
            _ => Shell::Generic,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Shell::Zsh => "zsh",
            Shell::Bash => "bash",
            Shell::Fish => "fish",
            Shell::Pwsh => "pwsh",
            Shell::Elvish => "elvish",
            Shell::Nu => "nu",
            Shell::Cmd => "cmd",
            Shell::Generic => "shell",
        }
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Facts about the invocation handed over by the shell.
#[derive(Debug, Clone, Default)]
pub struct Flags {
    pub config: Option<PathBuf>,
    pub shell: String,
    pub shell_version: String,
    pub pwd: Option<PathBuf>,
    pub pswd: String,
    pub status: i32,
    pub execution_time: f64,
    pub terminal_width: Option<usize>,
    pub jobs: u32,
    pub stack_count: u32,
    pub plain: bool,
}

/// Everything segments and the composer may ask about the outside world.
pub trait Environment: Send + Sync {
    fn shell(&self) -> Shell;
    fn shell_version(&self) -> &str;
    fn os(&self) -> &str;
    fn is_wsl(&self) -> bool;
    fn terminal_width(&self) -> Option<usize>;
    fn pwd(&self) -> &Path;
    fn pswd(&self) -> &str;
    fn home(&self) -> Option<PathBuf>;
    fn getenv(&self, key: &str) -> Option<String>;
    fn environ(&self) -> BTreeMap<String, String>;
    fn user(&self) -> String;
    fn host(&self) -> String;
    fn is_root(&self) -> bool;
    /// Exit code of the previous command.
    fn status(&self) -> i32;
    /// Duration of the previous command in milliseconds.
    fn execution_time(&self) -> f64;
    fn jobs(&self) -> u32;
    fn stack_count(&self) -> u32;
    /// Run a command and capture its stdout without trailing whitespace
    /// (stderr when stdout is empty).
    fn run_command<'a>(&'a self, command: &'a str, args: &'a [&'a str]) -> BoxFuture<'a, Option<String>>;
    /// Whether the working directory holds an entry matching a glob. The
    /// directory scan runs off the async thread so segment timeouts still fire.
    fn has_files<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, bool>;
    fn caches(&self) -> &Caches;
}

pub struct ShellEnvironment {
    flags: Flags,
    pwd: PathBuf,
    caches: Caches,
}

impl ShellEnvironment {
    pub fn new(flags: Flags, caches: Caches) -> Self {
        let pwd = flags
            .pwd
            .clone()
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        Self { flags, pwd, caches }
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }
}

impl Environment for ShellEnvironment {
    fn shell(&self) -> Shell {
        Shell::from_name(&self.flags.shell)
    }

    fn shell_version(&self) -> &str {
        &self.flags.shell_version
    }

    fn os(&self) -> &str {
        env::consts::OS
    }

    fn is_wsl(&self) -> bool {
        env::var_os("WSL_DISTRO_NAME").is_some()
    }

    fn terminal_width(&self) -> Option<usize> {
        self.flags
            .terminal_width
            .filter(|width| *width > 0)
            .or_else(|| env::var("COLUMNS").ok()?.trim().parse().ok())
    }

    fn pwd(&self) -> &Path {
        &self.pwd
    }

    fn pswd(&self) -> &str {
        &self.flags.pswd
    }

    fn home(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn getenv(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn environ(&self) -> BTreeMap<String, String> {
        env::vars().collect()
    }

    fn user(&self) -> String {
        env::var("USER")
            .or_else(|_| env::var("USERNAME"))
            .unwrap_or_default()
    }

    fn host(&self) -> String {
        if let Ok(host) = env::var("HOSTNAME") {
            if !host.is_empty() {
                return host;
            }
        }
        fs::read_to_string("/etc/hostname")
            .map(|host| host.trim().to_string())
            .unwrap_or_default()
    }

    fn is_root(&self) -> bool {
        self.user() == "root"
    }

    fn status(&self) -> i32 {
        self.flags.status
    }

    fn execution_time(&self) -> f64 {
        self.flags.execution_time
    }

    fn jobs(&self) -> u32 {
        self.flags.jobs
    }

    fn stack_count(&self) -> u32 {
        self.flags.stack_count
    }

    fn run_command<'a>(&'a self, command: &'a str, args: &'a [&'a str]) -> BoxFuture<'a, Option<String>> {
        async move {
            let output = Command::new(command)
                .args(args)
                .current_dir(&self.pwd)
                .kill_on_drop(true)
                .output()
                .await;

            match output {
                Ok(output) if output.status.success() => {
                    let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
                    if !stdout.is_empty() {
                        return Some(stdout);
                    }
                    Some(String::from_utf8_lossy(&output.stderr).trim_end().to_string())
                }
                Ok(output) => {
                    debug_with_context(command, &format!("exited with {}", output.status));
                    None
                }
                Err(e) => {
                    debug_with_context(command, &format!("failed to start: {}", e));
                    None
                }
            }
        }
        .boxed()
    }

    fn has_files<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, bool> {
        let Ok(pattern) = glob::Pattern::new(pattern) else {
            return future::ready(false).boxed();
        };
        let pwd = self.pwd.clone();

        async move {
            let scan = task::spawn_blocking(move || {
                WalkDir::new(&pwd)
                    .min_depth(1)
                    .max_depth(1)
                    .into_iter()
                    .filter_map(Result::ok)
                    .any(|entry| pattern.matches(&entry.file_name().to_string_lossy()))
            });
            match scan.await {
                Ok(found) => found,
                Err(e) => {
                    debug_with_context("files", &format!("directory scan failed: {}", e));
                    false
                }
            }
        }
        .boxed()
    }

    fn caches(&self) -> &Caches {
        &self.caches
    }
}
