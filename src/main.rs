//! # qarag CLI
//!
//! Ask questions about uploaded PDFs from the terminal.
//!
//! ## Usage
//!
//! ```bash
//! qarag --config ./config/qarag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `qarag files` | List documents indexed by the backend |
//! | `qarag upload <PATH>...` | Upload PDFs and follow ingestion |
//! | `qarag ask "<query>"` | Ask one question, print answer and evidence |
//! | `qarag clear` | Wipe backend documents and the session |
//! | `qarag chat` | Interactive session |
//! | `qarag completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! qarag upload contract.pdf annex.pdf
//! qarag ask "What is the termination clause?"
//! qarag ask "Who are the parties?" --json | jq .evidence
//! QARAG_BACKEND_URL=http://rag.internal:8000 qarag chat
//! ```

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use qarag::progress::ProgressMode;
use qarag::{chat, commands, config};

/// qarag: question answering over your PDFs.
///
/// All commands accept `--config` pointing to a TOML file. A missing file
/// means defaults; the backend URL can also come from `QARAG_BACKEND_URL`.
#[derive(Parser)]
#[command(
    name = "qarag",
    about = "Terminal client for a PDF question-answering service",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/qarag.toml")]
    config: PathBuf,

    /// Log at info level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Ingestion progress on stderr. Default: human when stderr is a TTY.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List documents indexed by the backend.
    Files,

    /// Upload PDF files for indexing.
    ///
    /// Non-PDF paths are skipped with a warning. Progress moves through
    /// upload, parsing and vector mapping until the backend confirms.
    Upload {
        /// PDF files to upload.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Ask a single question.
    Ask {
        /// The question.
        query: String,

        /// Print answer, trace and evidence as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Wipe all documents on the backend and the local session.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },

    /// Start an interactive chat session.
    Chat,

    /// Print shell completions to stdout.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(
            *shell,
            &mut Cli::command(),
            "qarag",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Files => commands::run_files(&cfg).await?,
        Commands::Upload { paths } => {
            let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);
            commands::run_upload(&cfg, &paths, progress).await?;
        }
        Commands::Ask { query, json } => commands::run_ask(&cfg, &query, json).await?,
        Commands::Clear { yes } => commands::run_clear(&cfg, yes).await?,
        Commands::Chat => chat::run_chat(&cfg, cli.progress).await?,
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
