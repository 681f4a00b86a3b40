pub mod create;
pub mod deploy;
pub mod destroy;

use aplctl_core::{RunReport, StackStatus};
use colored::Colorize;

/// One line per visited stack, in visit order
pub(crate) fn print_report(report: &RunReport) {
    for outcome in &report.outcomes {
        let (mark, status) = match outcome.status {
            StackStatus::Applied => ("✓".green(), "applied"),
            StackStatus::Destroyed => ("✓".green(), "destroyed"),
            StackStatus::Purged => ("✓".green(), "destroyed, state removed"),
            StackStatus::Absent => ("ℹ".blue(), "skipped, no stack state"),
        };
        println!("  {} {} ({})", mark, outcome.stack.cyan(), status);
    }
}
