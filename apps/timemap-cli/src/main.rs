mod script;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use script::{Report, Script, Session};

/// Insert, remove and roll back on a small map, printing the state after each step.
const DEMO_SCRIPT: &str = r#"
initial: { foo: 1 }
steps:
  - show
  - insert: { key: bar, value: 2 }
  - show
  - remove: foo
  - show
  - lookup: foo
  - rollback
  - show
  - rollback
  - show
  - rollback
  - show
"#;

#[derive(Parser)]
#[command(name = "timemap-cli", about = "CLI tool for timemap version histories")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Run the built-in insert/remove/rollback walkthrough
    Demo {
        /// Print one JSON object per step
        #[arg(long)]
        json: bool,
    },
    /// Run a YAML script of map operations
    Run {
        /// Path to the script file
        script: PathBuf,
        /// Print one JSON object per step
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("timemap-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("core: {}", timemap::crate_info());
        }
        Commands::Demo { json } => {
            let script = Script::from_yaml(DEMO_SCRIPT)?;
            print_reports(&Session::run_script(script)?, json)?;
        }
        Commands::Run { script, json } => {
            let source = std::fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let parsed = Script::from_yaml(&source)?;
            tracing::info!(steps = parsed.steps.len(), path = %script.display(), "running script");
            print_reports(&Session::run_script(parsed)?, json)?;
        }
    }

    Ok(())
}

fn print_reports(reports: &[Report], json: bool) -> anyhow::Result<()> {
    for report in reports {
        if json {
            println!("{}", serde_json::to_string(report)?);
        } else {
            println!("{report}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Outcome;
    use serde_json::json;

    #[test]
    fn demo_script_walks_back_to_the_root() {
        let script = Script::from_yaml(DEMO_SCRIPT).unwrap();
        let reports = Session::run_script(script).unwrap();

        let shows: Vec<serde_json::Value> = reports
            .iter()
            .filter_map(|r| match &r.outcome {
                Outcome::State { entries } => Some(serde_json::to_value(entries).unwrap()),
                _ => None,
            })
            .collect();
        assert_eq!(
            shows,
            vec![
                json!({"foo": 1}),
                json!({"bar": 2, "foo": 1}),
                json!({"bar": 2}),
                json!({"bar": 2, "foo": 1}),
                json!({"foo": 1}),
                json!({"foo": 1}),
            ]
        );

        let lookup = reports.iter().find(|r| r.op == "lookup").unwrap();
        assert_eq!(lookup.outcome, Outcome::Removed { key: "foo".into() });

        // Third rollback starts at the root and stays there.
        let rollbacks: Vec<usize> = reports
            .iter()
            .filter(|r| r.op == "rollback")
            .map(|r| r.depth)
            .collect();
        assert_eq!(rollbacks, vec![1, 0, 0]);
        assert_eq!(reports.last().map(|r| r.depth), Some(0));
    }
}
