use crate::demo::{
    run_crowd_monitor, run_demo, run_stroke_assessment, CrowdMonitorArgs, StrokeAssessArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use signal_risk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Signal Risk",
    about = "Score stroke risk and crowd density from unreliable signals",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Stroke-risk assessments for a single patient
    Stroke {
        #[command(subcommand)]
        command: StrokeCommand,
    },
    /// Crowd-density monitoring for a single site
    Crowd {
        #[command(subcommand)]
        command: CrowdCommand,
    },
    /// Walk through both domains with built-in sample inputs
    Demo,
}

#[derive(Subcommand, Debug)]
enum StrokeCommand {
    /// Assess one patient from a CSV export and optional symptom flags
    Assess(StrokeAssessArgs),
}

#[derive(Subcommand, Debug)]
enum CrowdCommand {
    /// Recompute a site's density on a timer and print each record
    Monitor(CrowdMonitorArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Stroke {
            command: StrokeCommand::Assess(args),
        } => run_stroke_assessment(args).await,
        Command::Crowd {
            command: CrowdCommand::Monitor(args),
        } => run_crowd_monitor(args).await,
        Command::Demo => run_demo().await,
    }
}
