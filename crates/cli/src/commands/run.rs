//! `gatekeeper run`: drive the pipeline for a task parameter.

use crate::executors::build_registry;
use crate::output::{print_summary, spawn_printer};
use anyhow::{bail, Context};
use colored::Colorize;
use gk_core::broadcast::ChannelBroadcaster;
use gk_core::pipeline::{PipelineOptions, StagePipeline, StartOutcome};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

pub async fn run(
    root: &Path,
    pipeline_name: &str,
    param: &str,
    step: bool,
) -> anyhow::Result<()> {
    let (config, definition) = super::load_pipeline(root, pipeline_name).await?;

    let mut options = PipelineOptions::from(&config.settings.pipeline);
    if step {
        options.auto_chain = false;
    }

    let registry = build_registry(&definition, root);
    let broadcaster = Arc::new(ChannelBroadcaster::default());
    let printer = spawn_printer(broadcaster.subscribe());
    let pipeline = StagePipeline::new(&definition, &registry, broadcaster.clone())
        .context("Failed to build pipeline")?
        .with_options(options);

    info!(pipeline = %definition.name, param, "running pipeline");

    let interrupt = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                pipeline.cancel().await;
            }
        })
    };

    let result = drive(&pipeline, param).await;
    let snapshot = pipeline.snapshot().await;

    // Close the channel so the printer drains and exits
    interrupt.abort();
    let _ = interrupt.await;
    drop(pipeline);
    drop(broadcaster);
    let _ = printer.await;

    print_summary(&snapshot);

    match result? {
        StartOutcome::Finished | StartOutcome::Ignored => Ok(()),
        StartOutcome::Paused { next_stage } => {
            println!("{}", format!("Stopped before {next_stage}.").yellow());
            Ok(())
        }
        StartOutcome::Canceled { stage } => bail!("Pipeline canceled at stage '{stage}'"),
        StartOutcome::Rejected { reason } => bail!(reason),
    }
}

/// Start the pipeline; in single-step mode, wait for Enter between stages.
async fn drive(pipeline: &StagePipeline, param: &str) -> anyhow::Result<StartOutcome> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let next_stage = match pipeline.start(param).await? {
            StartOutcome::Paused { next_stage } => next_stage,
            outcome => return Ok(outcome),
        };

        eprintln!("Press Enter to start {next_stage}...");
        if stdin.next_line().await?.is_none() {
            return Ok(StartOutcome::Paused { next_stage });
        }
    }
}
