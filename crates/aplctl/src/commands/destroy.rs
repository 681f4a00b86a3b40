use crate::commands::print_report;
use crate::platform::LoadedPlatform;
use aplctl_core::{APL, Order, StackCollection};
use colored::Colorize;
use std::path::Path;

/// What to remove besides the stacks' resources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeFlags {
    /// The esc environment, after all stacks are gone
    pub esc: bool,
    /// Object storage bucket contents, before `infra` is destroyed
    pub objects: bool,
    /// Each stack's state record, after its destroy
    pub stack: bool,
}

pub async fn handle(
    config: Option<&Path>,
    name: &str,
    target: Option<String>,
    purge: PurgeFlags,
) -> anyhow::Result<()> {
    let platform = LoadedPlatform::load(config, name)?;

    if target.as_deref() != Some(APL) && !purge.objects {
        println!(
            "{} ignoring obj buckets: contents stay until removed by hand (use --purge-obj)",
            "⚠".yellow()
        );
    }

    let environment = platform.environment()?;
    let orchestrator = platform.orchestrator(environment)?;
    let mut stacks = StackCollection::for_destroy(&platform.cmd_dir, target, purge.objects);

    println!("{}", "Destroying stacks...".yellow());
    let report = orchestrator
        .destroy(&mut stacks, Order::Descending, purge.stack)
        .await?;

    println!();
    print_report(&report);

    if purge.esc {
        let environment = &orchestrator.services().environment;
        environment.remove().await?;
        println!("  {} esc environment {} removed", "✓".green(), environment.id());
    }

    println!("{}", "✓ Destroy complete".green().bold());
    Ok(())
}
