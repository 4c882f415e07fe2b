//! Ingest command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::collect_text_files;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::PathBuf;

/// Run the ingest command.
pub async fn run_ingest(paths: &[PathBuf], force: bool, settings: Settings) -> Result<()> {
    let files = collect_text_files(paths)?;
    if files.is_empty() {
        Output::warning("No text files found to ingest.");
        return Ok(());
    }

    let orchestrator = Orchestrator::new(settings)?;
    if !orchestrator.ollama_available().await {
        Output::error(&format!(
            "Cannot reach Ollama at {}",
            orchestrator.settings().ollama.base_url
        ));
        Output::info("Run 'svar doctor' for detailed diagnostics.");
        anyhow::bail!("Ollama is not reachable");
    }

    Output::info(&format!("Ingesting {} file(s)", files.len()));

    let progress = Output::progress_bar(files.len() as u64, "Indexing");
    let mut indexed = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for file in &files {
        progress.set_message(file.display().to_string());
        match orchestrator.ingest_file(file, force).await {
            Ok(result) if result.skipped => {
                skipped += 1;
                progress.println(format!("  Skipped {} (already indexed)", result.source));
            }
            Ok(result) => {
                indexed += 1;
                progress.println(format!(
                    "  Indexed {} ({} chunks)",
                    result.source, result.chunks_indexed
                ));
            }
            Err(e) => {
                failed += 1;
                progress.println(format!("  Failed {}: {}", file.display(), e));
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if indexed > 0 {
        Output::success(&format!("Indexed {} file(s)", indexed));
    }
    if skipped > 0 {
        Output::info(&format!(
            "Skipped {} already-indexed file(s). Use --force to reindex.",
            skipped
        ));
    }
    if failed > 0 {
        anyhow::bail!("{failed} file(s) failed to ingest");
    }

    Ok(())
}
