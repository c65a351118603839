use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for timemap")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Run fmt, clippy, tests and doc in that order
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates, warnings denied
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Run the version history benchmark in release mode
    Bench,
    /// Build the entire workspace
    Build,
}

impl Commands {
    /// The cargo invocation behind a single task.
    fn cargo_args(self) -> &'static [&'static str] {
        match self {
            Self::Fmt => &["fmt", "--all", "--", "--check"],
            Self::Clippy => &[
                "clippy",
                "--workspace",
                "--all-targets",
                "--",
                "-D",
                "warnings",
            ],
            Self::Test => &["test", "--workspace"],
            Self::Doc => &["doc", "--workspace", "--no-deps"],
            Self::Bench => &["bench", "-p", "timemap", "--bench", "bench_history"],
            Self::Build => &["build", "--workspace"],
            Self::Check => &[],
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let tasks: &[Commands] = match cli.command {
        Commands::Check => &[
            Commands::Fmt,
            Commands::Clippy,
            Commands::Test,
            Commands::Doc,
        ],
        _ => std::slice::from_ref(&cli.command),
    };

    for task in tasks {
        run_cargo(task.cargo_args())?;
    }

    Ok(())
}

fn run_cargo(args: &[&str]) -> Result<()> {
    println!("==> Running cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {} failed", args[0]);
    }
    Ok(())
}
