//! Terminal rendering of pipeline progress.

use colored::Colorize;
use gk_protocol::stage_models::{PipelineSnapshot, StageStatus};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::task::JoinHandle;

/// Print broadcast messages until every sender is gone.
pub fn spawn_printer(mut rx: Receiver<Arc<str>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    for line in message.lines() {
                        println!("{}", style_line(line));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("{}", format!("... {skipped} messages skipped").dimmed());
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn style_line(line: &str) -> String {
    if line.starts_with("Starting ") {
        line.cyan().to_string()
    } else if line.ends_with(" completed successfully.") || line == "Pipeline finished." {
        line.green().to_string()
    } else if line.contains(" failed: ") {
        line.red().to_string()
    } else if line.ends_with(" canceled.") {
        line.yellow().to_string()
    } else {
        line.to_string()
    }
}

fn status_label(status: StageStatus) -> String {
    match status {
        StageStatus::Pending => "pending".dimmed().to_string(),
        StageStatus::InProgress => "in progress".cyan().to_string(),
        StageStatus::Completed => "completed".green().to_string(),
        StageStatus::Failed => "failed".red().to_string(),
    }
}

/// Print the per-stage summary.
pub fn print_summary(snapshot: &PipelineSnapshot) {
    println!();
    for (index, stage) in snapshot.stages.iter().enumerate() {
        println!("  {}. {:<28} {}", index + 1, stage.name, status_label(stage.status));
    }
    println!(
        "  {}/{} stages completed ({:.0}%)",
        snapshot.completed_count,
        snapshot.stages.len(),
        snapshot.progress_percent
    );
}
