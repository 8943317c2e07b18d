mod commands;

use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sitekit")]
#[command(version, about = "Static site generator for tagged markdown blogs", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Initialize a new site directory
    Init {
        /// Path to create the site in
        path: PathBuf,

        /// Site title written to site.toml
        #[arg(long)]
        title: Option<String>,
    },

    /// Build the site
    Build {
        /// Path to site directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output directory (overrides dirs.output in site.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Preview the site locally with live reload
    Serve {
        /// Path to site directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Port to serve on (overrides server.port in site.toml)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate site.toml and every content file
    Check {
        /// Path to site directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Print the site tag list
    Tags {
        /// Path to site directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the filters available to page layouts
    Filters,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Init { path, title } => commands::init::run(path, title).await,
        Command::Build { path, output } => commands::build::run(path, output).await,
        Command::Serve { path, port } => commands::serve::run(path, port).await,
        Command::Check { path } => commands::check::run(path).await,
        Command::Tags { path, json } => commands::tags::run(path, json).await,
        Command::Filters => {
            commands::filters::run();
            Ok(())
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "sitekit", &mut io::stdout());
            Ok(())
        }
    }
}
