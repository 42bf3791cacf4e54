//! Demo REPL over the command engine.
//!
//! Reads lines from stdin, routes them through the confirmation gate, and
//! prints the replies. Non-command input would go to a chat model in a real
//! host; here it gets a placeholder line.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use zona::config::Allowlist;
use zona::plugins::{builtin, PluginLoader};
use zona::{Dispatcher, Engine, InMemoryStore, SessionMemory};

#[derive(Parser, Debug)]
#[command(name = "zona", about = "Confirmation-gated bang-command engine", version)]
struct Cli {
    /// Trusted plugin directory
    #[arg(long, default_value = "plugins")]
    plugins_dir: PathBuf,

    /// Session key for this REPL
    #[arg(long, default_value = "default")]
    session: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let allowlist = Allowlist::resolve(&cli.plugins_dir);
    let loader = PluginLoader::new(&cli.plugins_dir, builtin::default_set(), allowlist);
    tracing::info!(
        dir = %loader.plugins_dir().display(),
        plugins = ?loader.registry().names(),
        "plugin registry ready"
    );

    let memory: Arc<dyn SessionMemory> = Arc::new(InMemoryStore::new());
    let engine = Engine::new(Dispatcher::new(loader), memory);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut line = String::new();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim_end_matches(['\r', '\n']);
        if text.is_empty() {
            continue;
        }
        match engine.handle_raw_input(&cli.session, text) {
            Some(reply) => println!("{reply}"),
            None => println!("(no chat model configured; try a !command)"),
        }
    }

    Ok(())
}
