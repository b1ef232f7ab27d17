use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use pdf_semantic_app::{run_server, Services, Settings, DEFAULT_MAX_UPLOAD_BYTES};
use pdf_semantic_core::{discover_pdf_files, IngestRequest, SearchOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-semantic", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    settings: Settings,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the upload and search HTTP API.
    Serve {
        /// Address to bind (host:port).
        #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
        bind: String,
        /// Include the error source chain in error responses.
        #[arg(long, env = "EXPOSE_ERROR_DETAIL", default_value_t = false)]
        expose_error_detail: bool,
        /// Largest accepted upload body, in bytes.
        #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
        max_upload_bytes: usize,
    },
    /// Ingest one PDF, or every PDF below a folder.
    Ingest {
        /// PDF file or folder searched recursively.
        #[arg(long)]
        path: PathBuf,
        /// Document title. Defaults to the file stem; ignored for folders.
        #[arg(long)]
        title: Option<String>,
    },
    /// Search ingested pages.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Override the configured similarity threshold.
        #[arg(long)]
        threshold: Option<f64>,
        /// Override the configured result limit.
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.settings.to_config()?;
    let services = Arc::new(Services::from_settings(&cli.settings, &config).await?);

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-semantic boot"
    );

    match cli.command {
        Command::Serve {
            bind,
            expose_error_detail,
            max_upload_bytes,
        } => {
            run_server(services, &bind, expose_error_detail, max_upload_bytes).await?;
        }
        Command::Ingest { path, title } => {
            if path.is_dir() {
                ingest_folder(&services, &path).await?;
            } else {
                let title = title.unwrap_or_else(|| file_stem(&path));
                ingest_file(&services, &path, title).await?;
            }
        }
        Command::Search {
            query,
            threshold,
            limit,
        } => {
            let defaults = *services.search.options();
            let options = SearchOptions {
                threshold: threshold.unwrap_or(defaults.threshold),
                limit: limit.unwrap_or(defaults.limit),
            };

            let results = services
                .search
                .search(&query, &options)
                .await
                .with_context(|| format!("search for {query:?} failed"))?;

            println!("query: {query}");
            if results.is_empty() {
                println!("no pages scored at or above {:.2}", options.threshold);
            }
            for hit in results {
                println!(
                    "score={:.4} document={} title={:?} page={}",
                    hit.similarity, hit.document_id, hit.document_title, hit.page_number
                );
                if !hit.text.is_empty() {
                    println!("  {}", preview(&hit.text, 240));
                }
            }
        }
    }

    Ok(())
}

async fn ingest_file(services: &Services, path: &Path, title: String) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string);

    let report = services
        .pipeline
        .ingest(IngestRequest {
            bytes,
            title,
            file_name,
        })
        .await
        .with_context(|| format!("failed to ingest {}", path.display()))?;

    for failure in &report.failures {
        warn!(page = failure.page_number, reason = %failure.reason, "page stored without embedding");
    }

    println!(
        "{} ingested as {} ({} pages, {} embedded) at {}",
        path.display(),
        report.document.id,
        report.document.pages.len(),
        report.document.embedded_pages(),
        Utc::now().to_rfc3339()
    );
    Ok(())
}

async fn ingest_folder(services: &Services, folder: &Path) -> anyhow::Result<()> {
    let files = discover_pdf_files(folder);
    if files.is_empty() {
        anyhow::bail!("no pdf files found in {}", folder.display());
    }

    let mut skipped = 0usize;
    for path in &files {
        if let Err(error) = ingest_file(services, path, file_stem(path)).await {
            skipped += 1;
            warn!(path = %path.display(), reason = %error, "skipped pdf");
        }
    }

    info!(folder = %folder.display(), total = files.len(), skipped, "folder ingested");
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string()
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut preview: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        preview.push_str("...");
    }
    preview
}
