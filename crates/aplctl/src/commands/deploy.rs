use crate::commands::print_report;
use crate::platform::LoadedPlatform;
use aplctl_core::StackCollection;
use colored::Colorize;
use std::path::Path;

pub async fn handle(config: Option<&Path>, name: &str, target: Option<String>) -> anyhow::Result<()> {
    let platform = LoadedPlatform::load(config, name)?;
    let environment = platform.environment()?;

    if !environment.exists().await? {
        tracing::error!("esc environment not found: run 'create' command first");
        return Ok(());
    }

    let orchestrator = platform.orchestrator(environment)?;
    let mut stacks = StackCollection::for_deploy(&platform.cmd_dir, target);

    println!("{}", "Deploying stacks...".yellow());
    let report = orchestrator.apply(&mut stacks).await?;

    println!();
    print_report(&report);
    println!("{}", "✓ Deploy complete".green().bold());
    Ok(())
}
