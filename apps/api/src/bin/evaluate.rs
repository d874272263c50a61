//! Offline top-K evaluation: scores every résumé in a directory against one
//! job description and reports precision/recall/F1 at K.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use matcher_api::config::Config;
use matcher_api::embeddings::build_embedder;
use matcher_api::evaluation::{evaluate_top_k, ScoredDocument};
use matcher_api::ingest::load_document_text;
use matcher_api::matching::pipeline::{as_percent, MatchPipeline};

#[derive(Debug, Parser)]
#[command(name = "evaluate", about = "Top-K ranking evaluation for the résumé matcher")]
struct Cli {
    /// Directory of résumés (.pdf or .txt)
    #[arg(long, default_value = "evaluation_resumes")]
    resumes: PathBuf,

    /// Job description text file
    #[arg(long, default_value = "jd.txt")]
    jd: PathBuf,

    /// Cut-off for the top-K metrics
    #[arg(long, default_value_t = 5)]
    k: usize,

    /// Final score (0-1) at or above which a résumé counts as relevant
    #[arg(long, default_value_t = 0.7)]
    threshold: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("evaluate={0},matcher_api={0}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.k == 0 {
        bail!("--k must be at least 1");
    }

    let jd_text = std::fs::read_to_string(&cli.jd)
        .with_context(|| format!("Failed to read job description {}", cli.jd.display()))?;
    let files = resume_files(&cli.resumes)?;
    info!("Scoring {} résumés against {}", files.len(), cli.jd.display());

    let pipeline = MatchPipeline::new(build_embedder(&config.embedding));

    let batch = score_resumes(&pipeline, &files, &jd_text).await?;

    let (records, metrics) = evaluate_top_k(batch, cli.k, cli.threshold)?;
    let metrics = metrics.rounded();

    println!("Ranking (threshold {}):", cli.threshold);
    for (rank, record) in records.iter().enumerate() {
        println!(
            "  {:>3}. {:<40} {:>6.2}%  relevant={}",
            rank + 1,
            record.id,
            as_percent(record.final_score),
            record.label()
        );
    }
    println!();
    println!("Precision@{}: {}", metrics.k, metrics.precision_at_k);
    match metrics.recall_at_k {
        Some(recall) => println!("Recall@{}: {}", metrics.k, recall),
        None => println!("Recall@{}: undefined (no relevant résumés in batch)", metrics.k),
    }
    println!("F1@{}: {}", metrics.k, metrics.f1_at_k);

    Ok(())
}

/// Scores each résumé in order. A file that cannot be read or extracted
/// aborts the run, since dropping it would skew recall.
async fn score_resumes(
    pipeline: &MatchPipeline,
    files: &[PathBuf],
    jd_text: &str,
) -> Result<Vec<ScoredDocument>> {
    let mut batch = Vec::with_capacity(files.len());
    for path in files {
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let loaded = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || load_document_text(&path)).await?
        };
        let text = loaded.with_context(|| format!("Failed to load {id}"))?;

        let result = pipeline
            .analyze(&text, jd_text)
            .await
            .with_context(|| format!("Failed to score {id}"))?;
        batch.push(ScoredDocument {
            id,
            final_score: result.scores.final_score(),
        });
    }
    Ok(batch)
}

/// Résumé files in the directory, sorted by name so runs are reproducible.
fn resume_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read résumé directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use matcher_api::embeddings::{Embedder, EmbeddingError};

    use super::*;

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn pipeline() -> MatchPipeline {
        MatchPipeline::new(Arc::new(UnitEmbedder))
    }

    #[tokio::test]
    async fn test_score_resumes_keeps_every_file_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "python developer, 5 years").unwrap();
        std::fs::write(dir.path().join("b.txt"), "knitting").unwrap();

        let files = resume_files(dir.path()).unwrap();
        let batch = score_resumes(&pipeline(), &files, "python developer")
            .await
            .unwrap();

        let ids: Vec<&str> = batch.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.txt", "b.txt"]);
        assert!(batch[0].final_score > batch[1].final_score);
    }

    #[tokio::test]
    async fn test_unreadable_resume_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "python developer").unwrap();
        std::fs::write(dir.path().join("broken.pdf"), "%PDF-garbage").unwrap();

        let files = resume_files(dir.path()).unwrap();
        let err = score_resumes(&pipeline(), &files, "python developer")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("broken.pdf"), "Error was {err}");
    }

    #[test]
    fn test_resume_files_are_sorted_and_skip_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.pdf"), "a").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let names: Vec<String> = resume_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.txt"]);
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["evaluate"]);
        assert_eq!(cli.k, 5);
        assert_eq!(cli.threshold, 0.7);
        assert_eq!(cli.resumes, PathBuf::from("evaluation_resumes"));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        assert!(resume_files(Path::new("/definitely/not/here")).is_err());
    }
}
