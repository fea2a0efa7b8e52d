//! recsys - query the video recommendation engine from the shell
//!
//! Usage:
//!   recsys similar 42               # five most similar users as JSON
//!   recsys similar 42 --k 10        # ten of them
//!   recsys recommend 42             # ten recommended videos as JSON
//!   recsys bench 42                 # time both queries on a cold cache

use anyhow::Context;
use clap::{Parser, Subcommand};
use recommendation_engine::{Config, RecommendError, RecommendationEngine};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "recsys")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding users.csv, videos.csv and operations.csv
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Users with the closest interest profile
    Similar {
        user_id: u32,

        /// Number of neighbors (defaults to RECSYS_SIMILAR_K)
        #[arg(long)]
        k: Option<usize>,
    },

    /// Videos the user has not seen yet, best first
    Recommend {
        user_id: u32,

        /// Number of videos (defaults to RECSYS_TOP_N)
        #[arg(long)]
        top_n: Option<usize>,
    },

    /// Time the similarity and recommendation queries
    Bench { user_id: u32 },
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::from_env().context("Failed to load config")?;
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }

    info!(data_dir = %config.data.data_dir.display(), "Starting recsys");

    let engine = RecommendationEngine::from_config(config);

    match cli.command {
        Commands::Similar { user_id, k } => {
            let k = k.unwrap_or(engine.config().similarity.default_k);
            let neighbors = engine.find_similar_k(user_id, k)?;
            println!("{}", serde_json::to_string_pretty(&neighbors)?);
        }
        Commands::Recommend { user_id, top_n } => {
            let top_n = top_n.unwrap_or(engine.config().recommend.default_top_n);
            match engine.recommend_top_n(user_id, top_n) {
                Ok(videos) => println!("{}", serde_json::to_string_pretty(&videos)?),
                Err(err) if err.is_empty_result() => {
                    println!("No recommendations for user {}", user_id);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Bench { user_id } => bench(&engine, user_id)?,
    }

    Ok(())
}

fn bench(engine: &RecommendationEngine, user_id: u32) -> anyhow::Result<()> {
    let started = Instant::now();
    let neighbors = engine.find_similar(user_id)?;
    let similar_secs = started.elapsed().as_secs_f64();
    println!("similar users: {:.2}s", similar_secs);
    println!("{}", serde_json::to_string(&neighbors)?);

    let started = Instant::now();
    let videos = match engine.recommend(user_id) {
        Ok(videos) => videos,
        Err(RecommendError::NoCandidates(_)) => Vec::new(),
        Err(err) => return Err(err.into()),
    };
    let recommend_secs = started.elapsed().as_secs_f64();
    println!("recommendations: {:.2}s", recommend_secs);
    println!("{}", serde_json::to_string(&videos)?);

    println!("total: {:.2}s", similar_secs + recommend_secs);
    Ok(())
}
