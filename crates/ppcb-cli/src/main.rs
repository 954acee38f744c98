use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use ppcb_core::{Category, ChecklistEntry, CommandSink, JsonLinesCommandSink, Status, StatusUpdate};
use ppcb_reconcile::{
    board_columns, category_counts, load_demands_report, people, DashboardSummary, DateOrdering,
    DemandFilter, ReconcileConfig, ReconcilePipeline,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ppcb")]
#[command(about = "PPC Board demand reconciliation")]
struct Cli {
    /// Default log level `debug` instead of `info`. `RUST_LOG` still wins.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reconcile the demand export with the work log and write a report run.
    Reconcile(ReconcileArgs),
    /// Dashboard and board view of a previous run's demands.json.
    Summary(SummaryArgs),
    /// Emit a status-change command as a JSON line.
    SetStatus {
        demand_id: String,
        /// Status code (`EM_ANDAMENTO`) or board label (`Em Andamento`).
        status: String,
    },
    /// Emit a checklist-entry command as a JSON line.
    AddChecklist {
        demand_id: String,
        text: String,
        #[arg(long)]
        done: bool,
    },
}

#[derive(Debug, Default, Args)]
struct ReconcileArgs {
    /// YAML config file; environment variables are read when absent.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    primary: Option<PathBuf>,
    #[arg(long)]
    logs: Option<PathBuf>,
    #[arg(long)]
    reports_dir: Option<PathBuf>,
    /// Count only work-log hours of this month, `YYYY-MM`.
    #[arg(long)]
    month: Option<String>,
    #[arg(long)]
    calendar_dates: bool,
}

#[derive(Debug, Args)]
struct SummaryArgs {
    #[arg(long)]
    demands: PathBuf,
    #[arg(long)]
    person: Option<String>,
    /// Category code or label, e.g. `CYBER`.
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    query: Option<String>,
    /// Also print the status columns.
    #[arg(long)]
    board: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command.unwrap_or_else(|| Commands::Reconcile(ReconcileArgs::default())) {
        Commands::Reconcile(args) => {
            let config = reconcile_config(args)?;
            let summary = ReconcilePipeline::new(config).run_once().await?;
            println!(
                "reconcile complete: run_id={} demands={} merged={} skipped_log_rows={} reports={}",
                summary.run_id,
                summary.stats.demands,
                summary.stats.merged_rows,
                summary.stats.skipped_log_rows,
                summary.reports_dir
            );
        }
        Commands::Summary(args) => print_summary(args)?,
        Commands::SetStatus { demand_id, status } => {
            let status: Status = status.parse()?;
            let mut sink = JsonLinesCommandSink::new(io::stdout().lock());
            sink.update_status(&StatusUpdate {
                demand_id,
                status,
                issued_at: Utc::now(),
            })?;
        }
        Commands::AddChecklist {
            demand_id,
            text,
            done,
        } => {
            let mut sink = JsonLinesCommandSink::new(io::stdout().lock());
            sink.add_checklist_entry(&ChecklistEntry {
                demand_id,
                text,
                done,
                issued_at: Utc::now(),
            })?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn reconcile_config(args: ReconcileArgs) -> Result<ReconcileConfig> {
    let mut config = match &args.config {
        Some(path) => ReconcileConfig::from_yaml_file(path)?,
        None => ReconcileConfig::from_env(),
    };
    if let Some(primary) = args.primary {
        config.primary_csv = primary;
    }
    if let Some(logs) = args.logs {
        config.logs_csv = Some(logs);
    }
    if let Some(dir) = args.reports_dir {
        config.reports_dir = dir;
    }
    if let Some(month) = args.month {
        config.month = Some(month);
    }
    if args.calendar_dates {
        config.date_ordering = DateOrdering::Calendar;
    }
    tracing::debug!(?config, "resolved reconcile config");
    Ok(config)
}

fn print_summary(args: SummaryArgs) -> Result<()> {
    let report = load_demands_report(&args.demands)?;
    let category = args
        .category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()?;
    let filter = DemandFilter {
        person: args.person,
        category,
        query: args.query,
    };
    let all = report.demands;
    let shown: Vec<_> = all.iter().filter(|d| filter.matches(d)).cloned().collect();

    let mut out = io::stdout().lock();
    writeln!(out, "# Run `{}`\n", report.run.run_id)?;
    writeln!(out, "{}\n", DashboardSummary::from_demands(&shown).to_markdown())?;

    let counts = category_counts(&all, &filter)
        .into_iter()
        .filter(|c| c.category != Category::Outros)
        .map(|c| format!("{} {}", c.category, c.count))
        .collect::<Vec<_>>()
        .join(" | ");
    writeln!(out, "Categorias: {counts}")?;
    writeln!(out, "Pessoas: {}", people(&all).join(", "))?;

    if args.board {
        for column in board_columns(&all, &filter) {
            writeln!(
                out,
                "\n## {} ({} • {:.0}h)",
                column.status,
                column.cards.len(),
                column.hours_adm
            )?;
            for card in column.cards {
                writeln!(
                    out,
                    "- [{}] {} / {} ({}) {:.0}h ADM",
                    card.initials, card.title, card.subtitle, card.category, card.hours_adm
                )?;
            }
        }
    }
    out.flush().context("writing summary")?;
    Ok(())
}
