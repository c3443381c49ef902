//! Coloured stdout rendering of pipeline events.

use colored::Colorize;
use pokepipeline_sync::PipelineObserver;

pub struct ConsoleObserver;

impl PipelineObserver for ConsoleObserver {
    fn on_progress(&self, message: &str) {
        println!("{} {message}", "→".green());
    }

    fn on_warning(&self, message: &str) {
        println!("{} {}", "!".yellow().bold(), message.yellow());
    }

    fn on_failure(&self, message: &str) {
        println!("{} {}", "✗".red().bold(), message.red());
    }
}
