use anyhow::{Context, Result};
use chrono::Utc;
use pico_args::Arguments;
use posh_line::color::Writer;
use posh_line::config::load_config_or_default;
use posh_line::utils::cache::Caches;
use posh_line::utils::{debug_enabled, debug_with_context, enable_debug, toggle, warn};
use posh_line::{Engine, Environment, Flags, Shell, ShellEnvironment};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder;

#[derive(Debug, Default)]
struct Args {
    flags: Flags,
    rprompt: bool,
    print_transient: bool,
    command: Option<String>,
    toggle: Option<String>,
    print_shell: bool,
    print_config: bool,
    millis: bool,
    cache_path: bool,
    cache_clean: bool,
    debug: bool,
    version: bool,
    help: bool,
}

impl Args {
    fn from_env() -> Result<Self> {
        Self::parse(Arguments::from_env())
    }

    fn parse(mut args: Arguments) -> Result<Self> {
        let flags = Flags {
            config: args.opt_value_from_str::<_, PathBuf>("--config")?,
            shell: args.opt_value_from_str("--shell")?.unwrap_or_default(),
            shell_version: args.opt_value_from_str("--shell-version")?.unwrap_or_default(),
            pwd: args.opt_value_from_str::<_, PathBuf>("--pwd")?,
            pswd: args.opt_value_from_str("--pswd")?.unwrap_or_default(),
            status: args.opt_value_from_str("--status")?.unwrap_or(0),
            execution_time: args.opt_value_from_str("--execution-time")?.unwrap_or(0.0),
            terminal_width: args.opt_value_from_str("--terminal-width")?,
            jobs: args.opt_value_from_str("--jobs")?.unwrap_or(0),
            stack_count: args.opt_value_from_str("--stack-count")?.unwrap_or(0),
            plain: args.contains("--plain"),
        };

        let mut parsed = Self {
            flags,
            rprompt: args.contains("--rprompt"),
            print_transient: args.contains("--print-transient"),
            command: args.opt_value_from_str("--command")?,
            print_shell: args.contains("--print-shell"),
            print_config: args.contains("--print-config"),
            millis: args.contains("--millis"),
            cache_path: args.contains("--cache-path"),
            cache_clean: args.contains("--cache-clean"),
            debug: args.contains("--debug"),
            version: args.contains("--version"),
            help: args.contains("--help") || args.contains("-h"),
            ..Self::default()
        };

        if let Some(subcommand) = args.subcommand()? {
            match subcommand.as_str() {
                "toggle" => {
                    let segment: String = args
                        .free_from_str()
                        .context("toggle needs a segment name")?;
                    parsed.toggle = Some(segment);
                }
                other => anyhow::bail!("unknown command: {}", other),
            }
        }

        let rest = args.finish();
        if !rest.is_empty() {
            debug_with_context("args", &format!("Ignoring unused arguments: {:?}", rest));
        }
        Ok(parsed)
    }
}

// The shell prints whatever we give it, so failures only ever reach stderr.
fn main() {
    let runtime = match Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            warn(&format!("Failed to start the async runtime: {}", e));
            return;
        }
    };

    if let Err(e) = runtime.block_on(run()) {
        warn(&format!("{:#}", e));
    }

    // Scans abandoned by a timed-out segment must not delay the exit.
    runtime.shutdown_background();
}

async fn run() -> Result<()> {
    let args = Args::from_env()?;

    if args.help {
        print_help();
        return Ok(());
    }

    if args.version {
        println!("posh-line {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.print_shell {
        return emit(Shell::from_name(&args.flags.shell).name());
    }

    // Shell hooks take timestamps with this to compute --execution-time.
    if args.millis {
        return emit(&Utc::now().timestamp_millis().to_string());
    }

    if args.debug {
        enable_debug();
    }

    if args.print_config {
        let config = load_config_or_default(args.flags.config.clone()).await;
        let json = serde_json::to_string_pretty(&config).context("Failed to serialize the configuration")?;
        return emit(&json);
    }

    let caches = Caches::open_default();

    if args.cache_path {
        for store in [&caches.session, &caches.device] {
            match store.path() {
                Some(path) => println!("{}", path.display()),
                None => warn(&format!("{:?} cache is unavailable", store.scope())),
            }
        }
        return Ok(());
    }

    if args.cache_clean {
        let mut removed = 0;
        for store in [&caches.session, &caches.device] {
            removed += store
                .clear_expired()
                .with_context(|| format!("Failed to clean the {:?} cache", store.scope()))?;
        }
        println!("Removed {} expired cache entries", removed);
        return Ok(());
    }

    if let Some(segment) = args.toggle {
        let off = toggle::toggle(&caches.session, &segment);
        debug_with_context("toggle", &format!("{} is now {}", segment, if off { "off" } else { "on" }));
        return Ok(());
    }

    let config = load_config_or_default(args.flags.config.clone()).await;
    let shell = Shell::from_name(&args.flags.shell);
    let writer = Writer::new(shell, args.flags.plain, config.palette.clone());
    let env: Arc<dyn Environment> = Arc::new(ShellEnvironment::new(args.flags, caches));
    let mut engine = Engine::new(config, env, writer);

    let prompt = if args.rprompt {
        engine.compose_right().await
    } else if args.print_transient {
        engine.compose_transient().await
    } else if let Some(command) = args.command.as_deref() {
        engine.compose_tooltip(command).await
    } else {
        engine.compose_primary().await
    };

    emit(&prompt)?;

    if debug_enabled() {
        eprintln!("{}", engine.report());
    }

    Ok(())
}

/// Write to stdout without a trailing newline; shells embed the text as is.
fn emit(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{}", text)?;
    stdout.flush()?;
    Ok(())
}

fn print_help() {
    println!("posh-line - Fast, cache-aware prompt renderer");
    println!();
    println!("USAGE:");
    println!("    posh-line [OPTIONS]");
    println!("    posh-line toggle <SEGMENT>");
    println!();
    println!("OUTPUT:");
    println!("    (default)                 Print the primary prompt");
    println!("    --rprompt                 Print the right prompt");
    println!("    --print-transient         Print the transient prompt");
    println!("    --command <TEXT>          Print the tooltip for a typed command");
    println!("    --print-shell             Print the shell name as posh-line sees it");
    println!("    --print-config            Print the effective configuration as JSON");
    println!("    --millis                  Print the current time in milliseconds");
    println!();
    println!("CONTEXT:");
    println!("    --config <FILE>           Custom config file path");
    println!("    --shell <NAME>            zsh, bash, fish, pwsh, elvish, nu, cmd");
    println!("    --shell-version <VER>     Version of the calling shell");
    println!("    --pwd <DIR>               Working directory");
    println!("    --pswd <TEXT>             Provider-specific working directory");
    println!("    --status <CODE>           Exit code of the previous command");
    println!("    --execution-time <MS>     Duration of the previous command");
    println!("    --terminal-width <COLS>   Terminal width in columns");
    println!("    --jobs <N>                Number of background jobs");
    println!("    --stack-count <N>         Directory stack depth");
    println!("    --plain                   Do not emit color escapes");
    println!();
    println!("MAINTENANCE:");
    println!("    --cache-path              Print the cache file locations");
    println!("    --cache-clean             Remove expired cache entries");
    println!("    --debug                   Print segment timings to stderr");
    println!("    --version                 Print version");
    println!("    --help                    Show this help message");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    POSH_LINE_CONFIG              Config path when --config is absent");
    println!("    POSH_LINE_SEGMENT_TIMEOUT_MS  Override segment_timeout_ms");
    println!("    POSH_LINE_CACHE_DIR           Cache directory");
    println!("    POSH_SESSION_ID               Session identity for the session cache");
    println!("    POSH_LINE_DEBUG               Enable debug logging");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn parse(args: &[&str]) -> Args {
        Args::parse(Arguments::from_vec(args.iter().map(OsString::from).collect())).unwrap()
    }

    #[test]
    fn test_context_flags() {
        let args = parse(&["--shell", "zsh", "--status", "2", "--terminal-width", "120", "--plain"]);
        assert_eq!(args.flags.shell, "zsh");
        assert_eq!(args.flags.status, 2);
        assert_eq!(args.flags.terminal_width, Some(120));
        assert!(args.flags.plain);
        assert!(args.toggle.is_none());
    }

    #[test]
    fn test_utility_flags() {
        let args = parse(&["--print-shell", "--shell", "pwsh"]);
        assert!(args.print_shell);
        assert_eq!(Shell::from_name(&args.flags.shell).name(), "pwsh");

        let args = parse(&["--millis"]);
        assert!(args.millis);
        assert!(!args.print_config);

        let args = parse(&["--print-config", "--config", "custom.json"]);
        assert!(args.print_config);
        assert_eq!(args.flags.config, Some(PathBuf::from("custom.json")));
    }

    #[test]
    fn test_toggle_subcommand() {
        let args = parse(&["toggle", "git"]);
        assert_eq!(args.toggle.as_deref(), Some("git"));
    }
}
