// gemini-history: inspect and export the captured conversation history
//
// Commands:
//   gemini-history list [--json]
//   gemini-history export [--out <dir>] [--stdout]
//   gemini-history path

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use gemini_chat_history::{
    capture::{export, RecordStore},
    config::Config,
    storage::KeyValueStore,
};

#[derive(Parser)]
#[command(name = "gemini-history")]
#[command(version, about = "Captured Gemini conversation history", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print recorded conversations, most recent first
    List {
        /// Print the raw records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the whole history to a timestamped JSON file
    Export {
        /// Directory for the export file (default: current directory)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the export instead of writing a file
        #[arg(long)]
        stdout: bool,
    },
    /// Print the location of the history file
    Path,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::List { json } => cmd_list(&config, json),
        Commands::Export { out, stdout } => cmd_export(&config, out, stdout),
        Commands::Path => {
            println!("{}", config.history_file().display());
            Ok(())
        }
    }
}

fn open_store(config: &Config) -> RecordStore {
    let backend: Rc<dyn KeyValueStore> = Rc::new(config.storage());
    RecordStore::new(backend)
}

fn cmd_list(config: &Config, json: bool) -> Result<()> {
    let records = open_store(config).load();

    if json {
        println!("{}", export::export_json(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No conversations recorded yet.");
        return Ok(());
    }

    for record in &records {
        println!("{}  {}  [{}]", record.timestamp, record.title, record.model);
        println!("    {}", record.address);
        if !record.attached_files.is_empty() {
            println!("    files: {}", record.attached_files.join(", "));
        }
    }
    println!();
    println!("{} conversation(s)", records.len());
    Ok(())
}

fn cmd_export(config: &Config, out: Option<PathBuf>, stdout: bool) -> Result<()> {
    let store = open_store(config);

    if stdout {
        let records = store.load();
        if records.is_empty() {
            eprintln!("No history found to export");
            return Ok(());
        }
        println!("{}", export::export_json(&records)?);
        return Ok(());
    }

    let dir = match out {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };
    match export::write_export(&dir, &store, Utc::now())? {
        Some(path) => println!("{}", path.display()),
        None => eprintln!("No history found to export"),
    }
    Ok(())
}
