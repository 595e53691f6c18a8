//! # corpus-chat CLI (`cchat`)
//!
//! The `cchat` binary is the minimal presentation layer for corpus-chat.
//! It builds the knowledge base from a folder of PDFs and answers
//! questions, either one-shot or in an interactive session.
//!
//! ## Usage
//!
//! ```bash
//! cchat --config ./config/cchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cchat corpus` | Scan, extract, and chunk the corpus without contacting any provider |
//! | `cchat ask "<question>"` | Build the index and answer one question |
//! | `cchat chat` | Interactive conversation over the corpus |
//!
//! ## Examples
//!
//! ```bash
//! # Check what the corpus folder yields before paying for embeddings
//! cchat corpus --config ./config/cchat.toml
//!
//! # One-shot question
//! cchat ask "What GPA is required for enrollment?" --config ./config/cchat.toml
//!
//! # Conversational session
//! cchat chat --config ./config/cchat.toml
//! ```

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use corpus_chat::chunk::chunk_text;
use corpus_chat::config::{self, Config};
use corpus_chat::controller::ChatController;
use corpus_chat::corpus::scan_corpus;
use corpus_chat::extract::extract_corpus;
use corpus_chat::models::Answer;

/// corpus-chat — a conversational assistant grounded in a folder of PDF
/// documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file describing the corpus folder, chunking and retrieval parameters,
/// and the embedding and language-model providers.
#[derive(Parser)]
#[command(
    name = "cchat",
    about = "corpus-chat — a conversational assistant grounded in a folder of PDF documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Inspect the corpus: scan, extract, and chunk without embedding.
    ///
    /// Reports per-file extraction status and the chunk count the index
    /// build would embed. Contacts no provider, so it is safe to run
    /// before any credentials are configured.
    Corpus,

    /// Answer a single question and exit.
    ///
    /// Builds the index from the corpus, answers the question on stdout
    /// with a sources footer, and exits 0. Exits non-zero when
    /// initialization fails (empty corpus, provider unreachable) or the
    /// answer cannot be generated.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Start an interactive conversation over the corpus.
    ///
    /// One session, one conversation window. `exit` or `quit` (or EOF)
    /// ends the session; `clear` starts the conversation over. A failed
    /// turn is reported and the session continues.
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Corpus => run_corpus(&cfg),
        Commands::Ask { question } => run_ask(&cfg, &question).await,
        Commands::Chat => run_chat(&cfg).await,
    }
}

fn run_corpus(cfg: &Config) -> anyhow::Result<()> {
    let files = scan_corpus(&cfg.corpus)?;
    let (documents, skipped) = extract_corpus(&files);

    let total_chunks: usize = documents
        .iter()
        .map(|doc| {
            chunk_text(
                &doc.info.id,
                &doc.text,
                cfg.chunking.max_chars,
                cfg.chunking.overlap_chars,
            )
            .len()
        })
        .sum();

    println!("corpus {}", cfg.corpus.dir.display());
    println!("  files found: {}", files.len());
    println!("  documents extracted: {}", documents.len());
    for skip in &skipped {
        println!("  skipped: {} ({})", skip.file_name, skip.reason);
    }
    println!("  chunks: {}", total_chunks);
    println!("ok");

    Ok(())
}

async fn run_ask(cfg: &Config, question: &str) -> anyhow::Result<()> {
    let mut controller = ChatController::initialize(cfg).await?;

    match controller.ask(question).await {
        Ok(answer) => {
            print_answer(&answer);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("{}", e)),
    }
}

async fn run_chat(cfg: &Config) -> anyhow::Result<()> {
    let mut controller = ChatController::initialize(cfg).await?;

    println!(
        "Loaded {} documents ({} chunks). Type 'exit' to quit, 'clear' to start over.",
        controller.document_count(),
        controller.chunk_count()
    );

    let stdin = std::io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }

        let question = line.trim();
        match question {
            "" => continue,
            "exit" | "quit" => break,
            "clear" => {
                controller.reset();
                println!("Conversation cleared.");
                continue;
            }
            _ => {}
        }

        match controller.ask(question).await {
            Ok(answer) => print_answer(&answer),
            Err(e) => {
                // The turn failed; memory is untouched and the session lives on.
                eprintln!("{}", e);
            }
        }
    }

    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text);
    if !answer.citations.is_empty() {
        println!();
        println!("sources:");
        for citation in &answer.citations {
            println!(
                "  {} (chunk {}, score {:.2})",
                citation.document_id, citation.chunk_index, citation.score
            );
        }
    }
}
