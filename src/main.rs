use anyhow::{bail, Context};
use notes_ingest::config::PipelineConfig;
use notes_ingest::pipeline::runner::Pipeline;
use notes_ingest::pipeline::store::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;

fn print_usage(program: &str) {
    eprintln!(
        "Usage: {} --input <notes.xml> [--backup <ids.csv>] [--config <config.json>]",
        program
    );
    eprintln!("       [--workers <n>] [--parts <n>] [--endpoint <url>]... [--work-dir <dir>] [--keep]");
    eprintln!("Example: {} --input planet-notes.xml --workers 8", program);
    eprintln!(
        "Example: {} --input notes.xml --backup boundaries.csv --endpoint http://localhost:12345/api/interpreter",
        program
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let level = if std::env::var_os("NOTES_DEBUG").is_some() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let mut input: Option<PathBuf> = None;
    let mut backup: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut workers: Option<usize> = None;
    let mut parts: Option<usize> = None;
    let mut endpoints: Vec<String> = vec![];
    let mut work_dir: Option<PathBuf> = None;
    let mut keep = false;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        if flag == "--keep" {
            keep = true;
            i += 1;
            continue;
        }

        let Some(value) = args.get(i + 1) else {
            print_usage(&args[0]);
            bail!("{} expects a value", flag);
        };
        match flag {
            "--input" => input = Some(PathBuf::from(value)),
            "--backup" => backup = Some(PathBuf::from(value)),
            "--config" => config_path = Some(PathBuf::from(value)),
            "--workers" => workers = Some(value.parse().context("--workers")?),
            "--parts" => parts = Some(value.parse().context("--parts")?),
            "--endpoint" => endpoints.push(value.clone()),
            "--work-dir" => work_dir = Some(PathBuf::from(value)),
            _ => {
                tracing::warn!("Ignoring unknown argument {}", flag);
                i += 1;
                continue;
            }
        }
        i += 2;
    }

    let Some(input) = input else {
        print_usage(&args[0]);
        std::process::exit(1);
    };

    let mut config = PipelineConfig::load(config_path.as_deref())?;
    if let Some(workers) = workers.filter(|n| *n > 0) {
        config.pool.requested_workers = workers;
    }
    if let Some(parts) = parts.filter(|n| *n > 0) {
        config.partition.target_parts = parts;
    }
    if !endpoints.is_empty() {
        config.query.endpoints = endpoints;
    }
    if let Some(dir) = work_dir {
        config.work_dir = dir;
    }
    config.keep_partitions |= keep;

    tracing::info!("Ingesting {}", input.display());
    tracing::info!(
        "Workers requested: {}, target parts: {}",
        config.pool.requested_workers,
        config.partition.target_parts
    );
    if let Some(backup) = &backup {
        tracing::info!("Reconciling against {}", backup.display());
    }

    let pipeline = Pipeline::from_config(config, Arc::new(MemoryStore::new()));
    let summary = pipeline.run(&input, backup.as_deref()).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    if !summary.within_tolerance() {
        tracing::error!(
            "{} unit(s) did not complete, tolerance is {}",
            summary.unit_failures(),
            summary.tolerance
        );
    }
    std::process::exit(summary.exit_code());
}
