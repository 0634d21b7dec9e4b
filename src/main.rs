use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tabular_qa::config::{
    AppConfig, LlmConfig, DEFAULT_ANNOTATIONS, DEFAULT_CATALOG_OUT, DEFAULT_DATA_DIR,
    DEFAULT_STORE_DIR,
};
use tabular_qa::execution::QueryResult;
use tabular_qa::llm::CompletionService;
use tabular_qa::session::{self, Session};
use tabular_qa::{Answer, AnswerOutcome};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Rows shown by `--debug`.
const DEBUG_PREVIEW_ROWS: usize = 10;

#[derive(Parser)]
#[command(name = "tabular-qa")]
#[command(about = "Ask natural-language questions about a directory of CSV tables")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Parquet table store
    #[arg(long, global = true, default_value = DEFAULT_STORE_DIR)]
    store_dir: PathBuf,

    /// Directory of CSV files loaded by `refresh`
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Annotation document
    #[arg(long, global = true, default_value = DEFAULT_ANNOTATIONS)]
    annotations: PathBuf,

    /// Where `refresh` writes the catalog JSON
    #[arg(long, global = true, default_value = DEFAULT_CATALOG_OUT)]
    catalog_out: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a single question
    Ask {
        question: String,

        /// Show generated SQL and a result preview
        #[arg(long)]
        debug: bool,
    },
    /// Interactive session; type `exit` to leave
    Chat {
        /// Show generated SQL and a result preview
        #[arg(long)]
        debug: bool,
    },
    /// Reload every CSV into a fresh table store and rebuild the catalog
    Refresh,
}

impl Cli {
    fn app_config(&self) -> AppConfig {
        AppConfig {
            store_dir: self.store_dir.clone(),
            data_dir: self.data_dir.clone(),
            annotations: self.annotations.clone(),
            catalog_out: self.catalog_out.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.app_config();

    match cli.command {
        Command::Ask { question, debug } => {
            let llm = LlmConfig::from_env()?.client();
            let mut session = Session::open(&config, Box::new(llm)).context("failed to open session")?;
            let answer = session.answer(&question).await?;
            display_answer(&answer, debug)?;
        }
        Command::Chat { debug } => {
            let llm = LlmConfig::from_env()?.client();
            let session = Session::open(&config, Box::new(llm)).context("failed to open session")?;
            chat(session, debug).await?;
        }
        Command::Refresh => {
            // the key is only needed to auto-fix malformed files
            let llm = match LlmConfig::from_env() {
                Ok(llm_config) => Some(llm_config.client()),
                Err(e) => {
                    warn!("CSV auto-fix disabled: {}", e);
                    None
                }
            };
            println!("🔄 Refreshing table store from {}...", config.data_dir.display());
            let summary = session::refresh(&config, llm.as_ref().map(|c| c as &dyn CompletionService))
                .await
                .context("refresh failed")?;
            println!("✓ Refresh complete");
            println!("  Table store: {}", summary.store_dir.display());
            println!("  Catalog: {}", summary.catalog_path.display());
            println!(
                "  Files loaded: {}, skipped: {}",
                summary.ingest.loaded, summary.ingest.skipped
            );
            for table in &summary.ingest.tables {
                println!("    {} ({} rows)", table.name, table.rows);
            }
            println!("  Tables in catalog: {}", summary.catalog_tables);
        }
    }

    Ok(())
}

async fn chat(mut session: Session, debug: bool) -> Result<()> {
    println!("✓ Ready ({} tables). Type 'exit' or 'quit' to end the session.\n", session.catalog().len());

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("❓ Your question: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let question = line?;
        let question = question.trim();

        if matches!(question.to_lowercase().as_str(), "exit" | "quit" | "q") {
            println!("👋 Goodbye!");
            break;
        }
        if question.is_empty() {
            continue;
        }

        match session.answer(question).await {
            Ok(answer) => {
                if let Err(e) = display_answer(&answer, debug) {
                    eprintln!("❌ Error: {:#}", e);
                }
            }
            Err(e) => {
                eprintln!("❌ Error: {}", e);
                eprintln!("You can ask another question or type 'exit' to quit.");
            }
        }
        println!("{}\n", "─".repeat(80));
    }

    Ok(())
}

fn display_answer(answer: &Answer, debug: bool) -> Result<()> {
    println!("🤔 Question: {}\n", answer.question);
    println!("💡 Answer:\n{}\n", answer.answer);

    if !debug {
        return Ok(());
    }

    println!("🔍 SQL:\n{}\n", answer.sql);
    if answer.outcome == AnswerOutcome::Exhausted {
        for (i, attempt) in answer.attempts.iter().enumerate() {
            println!("  attempt {} [{}]: {}", i + 1, attempt.class, attempt.error);
        }
        println!();
        return Ok(());
    }

    if answer.rows.is_empty() {
        println!("📊 No results returned\n");
        return Ok(());
    }

    println!(
        "📊 Result Preview: (showing {} of {} rows)\n",
        answer.rows.len(),
        answer.total_rows
    );
    let preview = QueryResult::from_records(&answer.rows)
        .to_dataframe()
        .context("failed to build preview table")?;
    println!("{:?}", preview.head(Some(DEBUG_PREVIEW_ROWS)));
    if answer.rows.len() > DEBUG_PREVIEW_ROWS {
        println!("\n... and {} more rows\n", answer.rows.len() - DEBUG_PREVIEW_ROWS);
    }
    Ok(())
}
