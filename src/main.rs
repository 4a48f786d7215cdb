//! shellkit - demo key/value shell
//!
//! A small interactive shell built on the shellkit engine. It keeps string
//! values under string keys for the lifetime of the session.
//!
//! # Commands
//!
//! | Command | Action |
//! |---------|--------|
//! | set <key> <value...> | Store a value |
//! | get [key] | Show one value, or all of them |
//! | unset <key> | Remove a value |
//! | wait <seconds> | Sleep (Ctrl+C cancels) |
//! | echo <text...> | Print text |
//! | clear | Clear the screen |
//! | help [command] | List commands or show details |
//! | exit | Leave the shell |
//!
//! # Quick Start
//!
//! ```text
//! shellkit                  # Interactive
//! shellkit --script x.txt   # Run the lines of x.txt and exit
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use shellkit::builtins::{ClearCommand, EchoCommand, ExitCommand};
use shellkit::color::{colorize, TextColor};
use shellkit::command::complete_word;
use shellkit::config::{self, ShellConfig};
use shellkit::console::{Console, ConsoleOptions, TerminalConsole};
use shellkit::history::{CommandHistory, FileHistory};
use shellkit::{
    CanHandle, CancellationToken, Command, DefaultCommandDispatcher, ParseResult, Shell,
    ShellError, ShellState, StringComparison,
};

/// Values kept by the demo shell
type Store = BTreeMap<String, String>;

/// Command line options
#[derive(Debug, Default)]
struct Options {
    /// Run this file instead of reading the keyboard
    script: Option<PathBuf>,
    /// Debug logging
    verbose: bool,
    /// No escape sequences
    no_color: bool,
    /// Write the default config file and exit
    init_config: bool,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("shellkit {}", VERSION);
}

fn print_help() {
    eprintln!("shellkit {} - interactive key/value shell", VERSION);
    eprintln!();
    eprintln!("Usage: shellkit [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --script <FILE>   Execute the lines of FILE, then exit");
    eprintln!("      --verbose         Debug logging to ~/.shellkit/shellkit.log");
    eprintln!("      --no-color        Disable colored output");
    eprintln!("      --init-config     Write ~/.shellkit/config.toml with defaults");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  Tab / Shift+Tab       Cycle completions");
    eprintln!("  Up / Down             History");
    eprintln!("  Insert                Toggle overwrite mode");
    eprintln!("  Esc                   Clear the line");
    eprintln!("  Ctrl+C                Cancel the running command or the line");
    eprintln!("  Ctrl+D                Exit (on an empty line)");
    eprintln!("  Ctrl+L                Clear the screen");
    eprintln!();
    eprintln!("Configuration: ~/.shellkit/config.toml");
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-s" | "--script" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing script file argument".to_string());
                }
                options.script = Some(PathBuf::from(&args[i]));
            }
            "--verbose" => {
                options.verbose = true;
            }
            "--no-color" => {
                options.no_color = true;
            }
            "--init-config" => {
                options.init_config = true;
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(options)
}

/// Log to ~/.shellkit/shellkit.log; the terminal belongs to the shell
fn init_logging(verbose: bool) {
    let Some(dir) = config::config_dir() else {
        return;
    };
    let log_path = dir.join("shellkit.log");
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = if verbose { "debug" } else { "info" };
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::new(filter))
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// Keys of `store` completing the selected section
fn suggest_keys<'a>(
    store: &'a Store,
    parse_result: &'a ParseResult,
) -> Box<dyn Iterator<Item = String> + 'a> {
    Box::new(
        store
            .keys()
            .filter_map(move |key| complete_word(key, parse_result)),
    )
}

/// Completion for `<word> <key>`
fn suggest_word_then_key<'a>(
    word: &str,
    store: &'a Store,
    parse_result: &'a ParseResult,
) -> Box<dyn Iterator<Item = String> + 'a> {
    match parse_result.selected_section() {
        0 => Box::new(complete_word(word, parse_result).into_iter()),
        1 if parse_result.contains_at_least(StringComparison::OrdinalIgnoreCase, &[word]) => {
            suggest_keys(store, parse_result)
        }
        _ => Box::new(std::iter::empty()),
    }
}

struct SetCommand;

impl Command<Store> for SetCommand {
    fn name(&self) -> &str {
        "set"
    }

    fn can_handle(&self, _: &ShellState, _: &Store, parse_result: &ParseResult) -> CanHandle {
        if !parse_result.contains_at_least(StringComparison::OrdinalIgnoreCase, &["set"]) {
            return CanHandle::Unknown;
        }
        if parse_result.section_count() >= 3 {
            CanHandle::Yes
        } else {
            CanHandle::No
        }
    }

    fn execute(
        &self,
        _: &mut ShellState,
        store: &mut Store,
        parse_result: &ParseResult,
        _: &CancellationToken,
    ) -> anyhow::Result<()> {
        let key = parse_result.section(1).unwrap_or_default().to_string();
        let value = parse_result.slice(2).sections().join(" ");
        store.insert(key, value);
        Ok(())
    }

    fn suggest<'a>(
        &'a self,
        _: &'a ShellState,
        store: &'a Store,
        parse_result: &'a ParseResult,
    ) -> Box<dyn Iterator<Item = String> + 'a> {
        suggest_word_then_key("set", store, parse_result)
    }

    fn help_summary(&self, _: &ShellState, _: &Store) -> Option<String> {
        Some("Store a value under a key".to_string())
    }

    fn help_details(&self, _: &ShellState, _: &Store, _: &ParseResult) -> Option<String> {
        Some(
            "Usage: set <key> <value...>\n\nEverything after the key becomes the value."
                .to_string(),
        )
    }
}

struct GetCommand;

impl Command<Store> for GetCommand {
    fn name(&self) -> &str {
        "get"
    }

    fn can_handle(&self, _: &ShellState, _: &Store, parse_result: &ParseResult) -> CanHandle {
        if !parse_result.contains_at_least(StringComparison::OrdinalIgnoreCase, &["get"]) {
            return CanHandle::Unknown;
        }
        if parse_result.section_count() <= 2 {
            CanHandle::Yes
        } else {
            CanHandle::No
        }
    }

    fn execute(
        &self,
        shell: &mut ShellState,
        store: &mut Store,
        parse_result: &ParseResult,
        _: &CancellationToken,
    ) -> anyhow::Result<()> {
        let out = shell.console().out();
        match parse_result.section(1).filter(|key| !key.is_empty()) {
            Some(key) => {
                let value = store
                    .get(key)
                    .with_context(|| format!("Key '{}' is not set", key))?;
                out.write_line(value);
            }
            None if store.is_empty() => out.write_line("(no values)"),
            None => {
                for (key, value) in store.iter() {
                    out.write_line(&format!("{} = {}", key, value));
                }
            }
        }
        Ok(())
    }

    fn suggest<'a>(
        &'a self,
        _: &'a ShellState,
        store: &'a Store,
        parse_result: &'a ParseResult,
    ) -> Box<dyn Iterator<Item = String> + 'a> {
        suggest_word_then_key("get", store, parse_result)
    }

    fn help_summary(&self, _: &ShellState, _: &Store) -> Option<String> {
        Some("Show a value, or every value".to_string())
    }

    fn help_details(&self, _: &ShellState, _: &Store, _: &ParseResult) -> Option<String> {
        Some("Usage: get [key]".to_string())
    }
}

struct UnsetCommand;

impl Command<Store> for UnsetCommand {
    fn name(&self) -> &str {
        "unset"
    }

    fn can_handle(&self, _: &ShellState, _: &Store, parse_result: &ParseResult) -> CanHandle {
        if !parse_result.contains_at_least(StringComparison::OrdinalIgnoreCase, &["unset"]) {
            return CanHandle::Unknown;
        }
        if parse_result.section_count() == 2 {
            CanHandle::Yes
        } else {
            CanHandle::No
        }
    }

    fn execute(
        &self,
        _: &mut ShellState,
        store: &mut Store,
        parse_result: &ParseResult,
        _: &CancellationToken,
    ) -> anyhow::Result<()> {
        let key = parse_result.section(1).unwrap_or_default();
        if store.remove(key).is_none() {
            anyhow::bail!("Key '{}' is not set", key);
        }
        Ok(())
    }

    fn suggest<'a>(
        &'a self,
        _: &'a ShellState,
        store: &'a Store,
        parse_result: &'a ParseResult,
    ) -> Box<dyn Iterator<Item = String> + 'a> {
        suggest_word_then_key("unset", store, parse_result)
    }

    fn help_summary(&self, _: &ShellState, _: &Store) -> Option<String> {
        Some("Remove a value".to_string())
    }

    fn help_details(&self, _: &ShellState, _: &Store, _: &ParseResult) -> Option<String> {
        Some("Usage: unset <key>".to_string())
    }
}

/// Sleeps in small steps so Ctrl+C can stop it
struct WaitCommand;

impl Command<Store> for WaitCommand {
    fn name(&self) -> &str {
        "wait"
    }

    fn can_handle(&self, _: &ShellState, _: &Store, parse_result: &ParseResult) -> CanHandle {
        if !parse_result.contains_at_least(StringComparison::OrdinalIgnoreCase, &["wait"]) {
            return CanHandle::Unknown;
        }
        let valid = parse_result.section_count() == 2
            && parse_result
                .section(1)
                .map_or(false, |s| s.parse::<f64>().map_or(false, |v| v >= 0.0));
        if valid {
            CanHandle::Yes
        } else {
            CanHandle::No
        }
    }

    fn execute(
        &self,
        shell: &mut ShellState,
        _: &mut Store,
        parse_result: &ParseResult,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let seconds: f64 = parse_result
            .section(1)
            .unwrap_or_default()
            .parse()
            .context("Invalid number of seconds")?;
        let deadline = Instant::now() + Duration::from_secs_f64(seconds);

        while Instant::now() < deadline {
            if cancel.is_cancelled() {
                shell.console().out().write_line("Cancelled");
                return Ok(());
            }
            thread::sleep(Duration::from_millis(20));
        }
        Ok(())
    }

    fn suggest<'a>(
        &'a self,
        _: &'a ShellState,
        _: &'a Store,
        parse_result: &'a ParseResult,
    ) -> Box<dyn Iterator<Item = String> + 'a> {
        if parse_result.selected_section() == 0 {
            Box::new(complete_word("wait", parse_result).into_iter())
        } else {
            Box::new(std::iter::empty())
        }
    }

    fn help_summary(&self, _: &ShellState, _: &Store) -> Option<String> {
        Some("Wait for some seconds (Ctrl+C cancels)".to_string())
    }
}

/// Echo unknown lines back with a hint
struct UnknownCommand;

impl Command<Store> for UnknownCommand {
    fn name(&self) -> &str {
        "unknown"
    }

    fn can_handle(&self, _: &ShellState, _: &Store, _: &ParseResult) -> CanHandle {
        CanHandle::Yes
    }

    fn execute(
        &self,
        shell: &mut ShellState,
        _: &mut Store,
        parse_result: &ParseResult,
        _: &CancellationToken,
    ) -> anyhow::Result<()> {
        let word = parse_result.section(0).unwrap_or_default();
        shell.console().error().write_line(&format!(
            "Unknown command '{}'. Type 'help' to list commands.",
            word
        ));
        Ok(())
    }
}

fn build_dispatcher(settings: &ShellConfig) -> DefaultCommandDispatcher<Store> {
    DefaultCommandDispatcher::new(Store::new())
        .with_prompt(settings.prompt.clone(), settings.prompt_color)
        .with_colors(settings.colors)
        .with_command(SetCommand)
        .with_command(GetCommand)
        .with_command(UnsetCommand)
        .with_command(WaitCommand)
        .with_command(EchoCommand)
        .with_command(ClearCommand)
        .with_command(ExitCommand)
        .with_fallback(UnknownCommand)
        .with_observer(|outcome| {
            if let Some(e) = outcome.error {
                info!("'{}' failed: {:#}", outcome.parse_result.command_text(), e);
            }
        })
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut settings = ShellConfig::load();
    settings.verbose |= options.verbose;
    if options.no_color {
        settings.colors = false;
    }

    if options.init_config {
        settings.save().map_err(anyhow::Error::msg)?;
        eprintln!("Wrote ~/{}/config.toml", config::CONFIG_DIR);
        return Ok(());
    }

    init_logging(settings.verbose);
    info!("shellkit {} starting", VERSION);

    let history: Box<dyn CommandHistory> = if settings.persist_history {
        Box::new(FileHistory::open_default(settings.history_limit))
    } else {
        Box::new(FileHistory::in_memory(settings.history_limit))
    };

    let console = Arc::new(TerminalConsole::new(ConsoleOptions {
        poll_interval: settings.poll_interval(),
        allow_output_redirection: settings.allow_output_redirection,
    }));

    let mut shell = Shell::builder()
        .console(console.clone())
        .dispatcher(build_dispatcher(&settings))
        .history(history)
        .hide_script_lines_from_history(settings.hide_script_lines_from_history)
        .build()?;

    let cancel = CancellationToken::new();

    if let Some(path) = options.script {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        info!("Running script {}", path.display());
        shell.run_script(content.lines(), &cancel)?;
        return Ok(());
    }

    let formatting = settings.colors && console.supports_formatting();
    loop {
        match shell.run(&cancel) {
            Ok(()) => break,
            Err(ShellError::CommandFailed { source, .. }) => {
                let message =
                    colorize(&format!("Error: {:#}", source), TextColor::BoldRed, formatting);
                console.error().write_line(&message);
            }
            Err(e) => {
                error!("Shell failed: {}", e);
                return Err(e.into());
            }
        }
    }

    info!("shellkit exiting");
    Ok(())
}
