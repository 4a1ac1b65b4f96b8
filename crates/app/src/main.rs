mod db;
mod study;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use services::{AppServices, Clock};
use storage::{QuizRepository, StorageError};

use crate::db::{DEFAULT_DB_URL, normalize_sqlite_url, prepare_sqlite_file};
use crate::study::{render_histogram, run_study};

#[derive(Parser)]
#[command(name = "quiz", about = "Study multiple-choice quizzes from text files", version)]
struct Cli {
    /// SQLite database url or path
    #[arg(long, global = true, env = "QUIZ_DB_URL", default_value = DEFAULT_DB_URL)]
    db: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a quiz document and store it
    Import {
        /// Path to the quiz text file
        file: PathBuf,
        /// Description to store with the quiz
        #[arg(long)]
        description: Option<String>,
    },

    /// List stored quiz names
    List,

    /// Answer questions until every one reaches the top level
    Study {
        /// Quiz name
        name: String,
        /// Seed for a reproducible question order
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show how many questions sit on each level
    Progress {
        /// Quiz name
        name: String,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let db_url = normalize_sqlite_url(&cli.db);
    prepare_sqlite_file(&db_url)?;
    let services = AppServices::new_sqlite(&db_url, Clock::default())
        .await
        .with_context(|| format!("opening {db_url}"))?;
    log::debug!("using database {db_url}");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Import { file, description } => {
            let imported = services.import().import_file(&file, description).await?;
            writeln!(
                out,
                "Imported {:?} with {} questions.",
                imported.name, imported.question_count
            )?;
        }
        Command::List => {
            let names = services.quizzes().list_quiz_names().await?;
            if names.is_empty() {
                writeln!(out, "No quizzes stored yet.")?;
            }
            for name in names {
                writeln!(out, "{name}")?;
            }
        }
        Command::Study { name, seed } => {
            let study = services.study_loop();
            let mut session = study
                .start(&name, seed)
                .await
                .map_err(|err| not_found_hint(err.into(), &name))?;
            let mut input = std::io::stdin().lock();
            run_study(&study, &mut session, &mut input, &mut out).await?;
        }
        Command::Progress { name } => {
            let histogram = services
                .study_loop()
                .levels_histogram(&name)
                .await
                .map_err(|err| not_found_hint(err.into(), &name))?;
            writeln!(out, "{name}:")?;
            render_histogram(&mut out, histogram)?;
        }
    }

    Ok(())
}

fn not_found_hint(err: anyhow::Error, name: &str) -> anyhow::Error {
    let missing = matches!(
        err.downcast_ref::<services::StudyError>(),
        Some(services::StudyError::Storage(StorageError::NotFound))
    );
    if missing {
        err.context(format!("no quiz named {name:?}; see `quiz list`"))
    } else {
        err
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}
