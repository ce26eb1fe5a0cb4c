use crate::demo::{run_demo, run_export, DemoArgs, ExportArgs};
use crate::infra::load_catalog;
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use welfare_fund::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Student Welfare Fund",
    about = "Review welfare fund applications and keep the fund ledger from the command line",
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
    /// Walk through the approval routes and an insufficient-funds refusal
    Demo(DemoArgs),
    /// Ledger reporting commands
    Ledger {
        #[command(subcommand)]
        command: LedgerCommand,
    },
    /// List the funding categories and their ceilings
    Categories(CategoriesArgs),
}

#[derive(Subcommand, Debug)]
enum LedgerCommand {
    /// Export the demo fund's ledger as a CSV statement
    Export(ExportArgs),
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

#[derive(Args, Debug, Default)]
pub(crate) struct CategoriesArgs {
    /// JSON catalogue to read instead of the built-in categories
    #[arg(long)]
    pub(crate) file: Option<PathBuf>,
    /// Include inactive categories
    #[arg(long)]
    pub(crate) all: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Ledger {
            command: LedgerCommand::Export(args),
        } => run_export(args),
        Command::Categories(args) => list_categories(args),
    }
}

fn list_categories(args: CategoriesArgs) -> Result<(), AppError> {
    let catalog = load_catalog(args.file.as_deref())?;
    let mut categories = catalog.list()?;
    categories.sort_by(|left, right| left.id.as_str().cmp(right.id.as_str()));

    for category in categories
        .into_iter()
        .filter(|category| args.all || category.active)
    {
        println!(
            "{:<28} RM {:>9}  {:<9} {:<10} {}{}",
            category.id.as_str(),
            category.max_amount.to_string(),
            if category.requires_committee_approval {
                "committee"
            } else {
                "admin"
            },
            category.claim_kind.label(),
            category.name,
            if category.active { "" } else { " (inactive)" },
        );
    }
    Ok(())
}
