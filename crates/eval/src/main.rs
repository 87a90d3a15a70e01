//! Evaluation CLI for the referral matching engine.
//!
//! Usage:
//!     eval rank --candidate candidate.json --employees employees.json --top 5
//!     eval adapt --feedback feedback.jsonl --state state.json
//!     eval weights --state state.json

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use referral_adapt::{AdaptationOutcome, AdaptationStrength, EngineState};
use referral_backend_embedding::{prefetch, EmbeddingBackend, EmbeddingConfig, HttpEmbeddingBackend};
use referral_engine::{EngineConfig, MatchEngine, MatchOutcome, MatchRequest};
use referral_explain::{summarize_match, RuleExplainer};
use referral_features::SimilarityRange;
use referral_model::{CandidateProfile, EmployeeProfile, FeedbackRecord, WeightVector};
use tracing::warn;

#[derive(Parser)]
#[command(name = "eval")]
#[command(about = "Rank referral matches and adapt weights from feedback")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank an employee pool for a candidate
    Rank {
        /// Candidate profile (JSON)
        #[arg(long)]
        candidate: PathBuf,

        /// Employee profiles (JSON array)
        #[arg(long)]
        employees: PathBuf,

        /// Saved engine state to score with
        #[arg(long)]
        state: Option<PathBuf>,

        /// Maximum results
        #[arg(short, long)]
        top: Option<usize>,

        /// Only employees whose company contains this text
        #[arg(long)]
        target_company: Option<String>,

        /// Embedding service URL for skill similarity
        #[arg(long)]
        embedding_url: Option<String>,

        /// Embedding score range (unit, cosine)
        #[arg(long, default_value = "cosine")]
        embedding_range: String,

        /// Evaluate activity relative to this RFC 3339 time instead of now
        #[arg(long)]
        now: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Replay feedback (JSON lines) and adapt the weights
    Adapt {
        /// Feedback records, one JSON object per line
        #[arg(long)]
        feedback: PathBuf,

        /// Engine state to resume from and save to
        #[arg(long)]
        state: PathBuf,

        /// Adaptation strength (conservative, auto, aggressive)
        #[arg(long)]
        strength: Option<String>,
    },

    /// Show saved weights and adaptation history
    Weights {
        /// Saved engine state
        #[arg(long)]
        state: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("referral=debug".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Rank {
            candidate,
            employees,
            state,
            top,
            target_company,
            embedding_url,
            embedding_range,
            now,
            format,
        } => {
            let embedding = embedding_url
                .map(|url| -> Result<_> {
                    Ok(EmbeddingConfig {
                        base_url: url,
                        range: parse_range(&embedding_range)?,
                        ..Default::default()
                    })
                })
                .transpose()?;
            let now = match now {
                Some(raw) => DateTime::parse_from_rfc3339(&raw)
                    .with_context(|| format!("invalid --now '{raw}'"))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };

            let engine = load_engine(config, state.as_deref())?.with_explainer(Arc::new(RuleExplainer));
            let candidate: CandidateProfile = read_json(&candidate)?;
            let employees: Vec<EmployeeProfile> = read_json(&employees)?;

            run_rank(
                &engine,
                &candidate,
                &employees,
                RankOptions {
                    top,
                    target_company: target_company.as_deref(),
                    embedding,
                    now,
                },
                &format,
            )
            .await?;
        }
        Commands::Adapt {
            feedback,
            state,
            strength,
        } => {
            let mut config = config;
            if let Some(strength) = strength {
                config.adaptation.strength = strength.parse::<AdaptationStrength>()?;
            }
            run_adapt(config, &feedback, &state)?;
        }
        Commands::Weights { state, format } => {
            let engine = load_engine(config, state.as_deref())?;
            run_weights(&engine, &format)?;
        }
    }

    Ok(())
}

fn parse_range(raw: &str) -> Result<SimilarityRange> {
    match raw {
        "unit" => Ok(SimilarityRange::Unit),
        "cosine" => Ok(SimilarityRange::Cosine),
        other => bail!("unknown embedding range '{other}' (expected unit or cosine)"),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Resume from `state` when it exists, otherwise start from the default weights.
fn load_engine(config: EngineConfig, state: Option<&Path>) -> Result<MatchEngine> {
    match state {
        Some(path) if path.exists() => {
            let state = EngineState::load(path)?;
            Ok(MatchEngine::from_state(config, state)?)
        }
        _ => Ok(MatchEngine::new(config)?),
    }
}

struct RankOptions<'a> {
    top: Option<usize>,
    target_company: Option<&'a str>,
    embedding: Option<EmbeddingConfig>,
    now: DateTime<Utc>,
}

async fn run_rank(
    engine: &MatchEngine,
    candidate: &CandidateProfile,
    employees: &[EmployeeProfile],
    options: RankOptions<'_>,
    format: &str,
) -> Result<()> {
    let table = match options.embedding {
        Some(config) => {
            let backend = HttpEmbeddingBackend::new(config)?;
            if let Err(e) = backend.health_check().await {
                warn!(error = %e, "Embedding service unhealthy, similarities may fall back to overlap");
            }
            Some(prefetch(&backend, candidate, employees).await)
        }
        None => None,
    };

    let mut request = MatchRequest::new(candidate, employees, options.now);
    if let Some(top) = options.top {
        request = request.with_top_n(top);
    }
    if let Some(company) = options.target_company {
        request = request.with_target_company(company);
    }
    if let Some(table) = &table {
        request = request.with_similarity(table);
    }

    let outcome = engine.match_candidate(&request);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(candidate, employees.len(), &outcome);
    }

    Ok(())
}

fn print_outcome(candidate: &CandidateProfile, pool: usize, outcome: &MatchOutcome) {
    println!("Candidate: {} ({} skills)", candidate.id, candidate.skills.len());
    println!("Pool: {} employees | Weights: v{}", pool, outcome.weights_version);
    println!("---");

    let matches = outcome.result.matches();
    if matches.is_empty() {
        println!("No qualified employees");
    }
    for (i, m) in matches.iter().enumerate() {
        println!("\n{}. {}", i + 1, m.employee_id);
        println!(
            "   Score: {:.1} | Confidence: {:.2} | Rank: {:.1}",
            m.overall_score,
            m.confidence,
            m.rank_score()
        );
        match &m.explanation {
            Some(explanation) => {
                println!("   {}", explanation.summary);
                println!("   {}", explanation.detail);
            }
            None => println!("   {}", summarize_match(m)),
        }
        let breakdown: Vec<String> = m
            .breakdown
            .iter()
            .map(|(c, s)| format!("{} {:.1}", c.label(), s))
            .collect();
        println!("   {}", breakdown.join(" | "));
    }

    let excluded = outcome.result.excluded();
    if !excluded.is_empty() {
        println!("\nExcluded:");
        for ex in excluded {
            println!("   {} ({})", ex.employee_id, ex.reason.label());
        }
    }

    println!("\n---");
    println!("Total: {} matches, {} excluded", matches.len(), excluded.len());
}

fn run_adapt(config: EngineConfig, feedback: &Path, state: &Path) -> Result<()> {
    let auto_adapt = config.auto_adapt;
    let engine = load_engine(config, Some(state))?;
    let start_version = engine.weights().version;

    let text = std::fs::read_to_string(feedback).with_context(|| format!("reading {}", feedback.display()))?;

    let (mut accepted, mut duplicates, mut rejected) = (0usize, 0usize, 0usize);
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: FeedbackRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                warn!(line = lineno + 1, error = %e, "Skipping unparseable feedback");
                rejected += 1;
                continue;
            }
        };
        match engine.ingest_feedback(record) {
            Ok(ack) if ack.receipt.accepted() => accepted += 1,
            Ok(_) => duplicates += 1,
            Err(e) => {
                warn!(line = lineno + 1, error = %e, "Rejected feedback");
                rejected += 1;
            }
        }
    }

    if !auto_adapt {
        match engine.adapt() {
            AdaptationOutcome::InsufficientData { available, required } => {
                println!("Not enough feedback to adapt ({available}/{required})");
            }
            AdaptationOutcome::Rejected { reason } => println!("Adaptation rejected: {reason}"),
            AdaptationOutcome::Adapted(_) => {}
        }
    }

    let exported = engine.export_state();
    exported.save(state)?;

    println!(
        "Feedback: {} accepted, {} duplicates, {} rejected | buffer {}",
        accepted,
        duplicates,
        rejected,
        engine.buffer_len()
    );
    println!(
        "Weights: v{} -> v{} ({} adaptations)",
        start_version,
        exported.version,
        exported.version.saturating_sub(start_version)
    );
    print_weights(&exported.weights);
    println!("Saved state to {}", state.display());

    Ok(())
}

fn run_weights(engine: &MatchEngine, format: &str) -> Result<()> {
    let state = engine.export_state();

    if format == "json" {
        println!("{}", state.to_json()?);
        return Ok(());
    }

    println!("Weights: v{}", state.version);
    print_weights(&state.weights);

    if state.history.is_empty() {
        println!("\nNo adaptations recorded");
        return Ok(());
    }

    println!("\nHistory ({} events):", state.history.len());
    for event in &state.history {
        let changes: Vec<String> = event
            .performances
            .iter()
            .filter(|p| p.delta != 0.0)
            .map(|p| format!("{} {:+.2}", p.component, p.delta))
            .collect();
        println!(
            "   v{} {} | {} samples, {:?} | {}",
            event.version,
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.sample_count,
            event.strength,
            if changes.is_empty() {
                "no change".to_string()
            } else {
                changes.join(", ")
            }
        );
    }

    Ok(())
}

fn print_weights(weights: &WeightVector) {
    for (component, weight) in weights.iter() {
        println!("   {:<22} {:.3}", component.label(), weight);
    }
}
