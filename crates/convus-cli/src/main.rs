//! `convus` maintenance binary.
//!
//! Opens the SQLite store named in `convus.toml` (or `--config`) and runs one
//! maintenance command against it: reconciling review topics, bulk topic
//! assignment, re-ranking an investigation, and topic housekeeping.

mod settings;

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand, ValueEnum};
use convus_core::{
  reconcile::TopicAssignment,
  store::RatingStore,
  topic::{Topic, TopicFilter},
};
use convus_store_sqlite::{SqliteStore, spawn_worker};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::settings::CliConfig;

#[derive(Parser)]
#[command(author, version, about = "Convus ratings maintenance")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "convus.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
  /// Make reviews' topic associations match their topic text.
  Reconcile {
    /// Reviews to reconcile; every review when omitted.
    #[arg(long = "review", value_name = "ID")]
    reviews: Vec<i64>,
  },
  /// Add or remove one topic across a user's reviews.
  AssignTopic {
    /// Topic id, slug or name.
    #[arg(long)]
    topic:    String,
    #[arg(long)]
    user:     i64,
    /// Reviews under consideration.
    #[arg(long, value_delimiter = ',', required = true)]
    included: Vec<i64>,
    /// Reviews that should carry the topic; the rest of `--included` lose it.
    #[arg(long, value_delimiter = ',')]
    selected: Vec<i64>,
  },
  /// Recalculate listing orders of an investigation's auto-ranked votes.
  Rank { investigation: i64 },
  /// List topics.
  Topics {
    #[arg(long, value_enum, default_value_t = FilterArg::All)]
    filter: FilterArg,
    /// Print JSON instead of one line per topic.
    #[arg(long)]
    json:   bool,
  },
  /// Rename a topic, keeping its old slug resolvable.
  RenameTopic {
    /// Topic id, slug or name.
    topic: String,
    name:  String,
  },
  /// Correct every topic's orphan flag.
  RepairOrphans,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FilterArg {
  All,
  Active,
  Orphaned,
}

impl From<FilterArg> for TopicFilter {
  fn from(arg: FilterArg) -> Self {
    match arg {
      FilterArg::All => TopicFilter::All,
      FilterArg::Active => TopicFilter::Active,
      FilterArg::Orphaned => TopicFilter::Orphaned,
    }
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = CliConfig::load(&cli.config)?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  if !cfg.worker {
    return run(&store, cli.command).await;
  }

  let (queue, worker) = spawn_worker(store.clone());
  let queued = store.with_queue(queue);
  let result = run(&queued, cli.command).await;

  // Dropping the last queue handle lets the worker drain and stop.
  drop(queued);
  worker.await.context("job worker panicked")?;
  result
}

async fn run<S: RatingStore>(store: &S, command: Command) -> anyhow::Result<()> {
  match command {
    Command::Reconcile { reviews } => {
      let review_ids = if reviews.is_empty() {
        store
          .list_reviews(None)
          .await?
          .into_iter()
          .map(|r| r.review_id)
          .collect()
      } else {
        reviews
      };

      let mut writes = 0;
      let mut failed = 0;
      for review_id in &review_ids {
        match store.reconcile_review_topics(*review_id).await {
          Ok(outcome) => writes += outcome.writes(),
          Err(e) => {
            warn!(review_id, error = %e, "reconcile failed");
            failed += 1;
          }
        }
      }
      info!(reviews = review_ids.len(), writes, failed, "reconcile finished");
      println!("reconciled {} reviews: {writes} writes, {failed} failed", review_ids.len());
    }

    Command::AssignTopic { topic, user, included, selected } => {
      let topic = find_topic(store, &topic).await?;
      let outcome = store
        .assign_topic(TopicAssignment { topic_id: topic.topic_id, user_id: user, included, selected })
        .await?;
      println!(
        "{}: added to {}, removed from {}",
        topic.name, outcome.added, outcome.removed
      );
      for failure in &outcome.failed {
        println!("  review {}: {}", failure.review_id, failure.message);
      }
    }

    Command::Rank { investigation } => {
      if store.get_investigation(investigation).await?.is_none() {
        bail!("no investigation {investigation}");
      }
      let changed = store.recalculate_listing_orders(investigation).await?;
      println!("{changed} listing orders changed");
    }

    Command::Topics { filter, json } => {
      let topics = store.list_topics(filter.into()).await?;
      if json {
        println!("{}", serde_json::to_string_pretty(&topics)?);
      } else {
        for topic in &topics {
          let marker = if topic.orphaned { " (orphaned)" } else { "" };
          println!("{:>6}  {}  [{}]{marker}", topic.topic_id, topic.name, topic.slug);
        }
      }
    }

    Command::RenameTopic { topic, name } => {
      let topic = find_topic(store, &topic).await?;
      let renamed = store.rename_topic(topic.topic_id, name).await?;
      println!("{} -> {} [{}]", topic.name, renamed.name, renamed.slug);
    }

    Command::RepairOrphans => {
      let changed = store.recompute_orphans().await?;
      println!("{changed} orphan flags corrected");
    }
  }

  Ok(())
}

async fn find_topic<S: RatingStore>(store: &S, reference: &str) -> anyhow::Result<Topic> {
  store
    .friendly_find_topic(reference.to_owned())
    .await?
    .with_context(|| format!("no topic matches {reference:?}"))
}
