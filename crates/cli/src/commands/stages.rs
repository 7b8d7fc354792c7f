//! `gatekeeper stages`: show the stages of a pipeline.

use colored::Colorize;
use std::path::Path;

pub async fn run(root: &Path, pipeline_name: &str, json: bool) -> anyhow::Result<()> {
    let (_, definition) = super::load_pipeline(root, pipeline_name).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&definition)?);
        return Ok(());
    }

    println!("{}", definition.name.bold());
    for (index, stage) in definition.stages.iter().enumerate() {
        println!("  {}. {}", index + 1, stage.name);
        if !stage.instruction.is_empty() {
            println!("     {}", stage.instruction.dimmed());
        }
        if let Some(command) = &stage.command {
            println!("     $ {} {}", command, stage.args.join(" "));
        }
    }
    Ok(())
}
