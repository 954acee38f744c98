//! Dual-source reconciliation: work-log aggregation, merge into primary rows,
//! batch normalization, plus the rollups and run reports built on top.

pub mod aggregate;
pub mod board;
pub mod config;
pub mod merge;
pub mod period;
pub mod pipeline;
pub mod summary;

use std::collections::BTreeSet;

use ppcb_core::{AggregateMap, Demand, DemandInput, PrimaryRow};
use ppcb_ingest::{
    parse, parse_table, primary_identifier, try_normalize_all, IngestError, NormalizeOptions,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub use aggregate::{
    aggregate, aggregate_with, extract_work_log, AggregateOptions, DateOrdering, LogExtraction,
};
pub use board::{
    board_columns, category_counts, people, BoardCard, BoardColumn, CategoryCount, DemandFilter,
};
pub use config::ReconcileConfig;
pub use merge::{merge, merge_row};
pub use period::{parse_log_date, restrict_to_period, Period};
pub use pipeline::{
    load_demands_report, run_once_from_env, DemandsReport, ReconcilePipeline, ReconcileRunSummary,
};
pub use summary::{CollaboratorHours, DashboardSummary, HourBucket};

pub const CRATE_NAME: &str = "ppcb-reconcile";

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid period: {0}")]
    InvalidPeriod(String),
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOptions {
    pub aggregate: AggregateOptions,
    pub normalize: NormalizeOptions,
    /// Only work-log entries dated inside the period count. Demands left
    /// without any in-period entry are dropped from the result.
    pub period: Option<Period>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    pub primary_rows: usize,
    pub log_entries: usize,
    pub skipped_log_rows: usize,
    /// Entries left after period restriction; equals `log_entries` without one.
    pub counted_log_entries: usize,
    pub aggregated_demands: usize,
    pub merged_rows: usize,
    /// Aggregates whose demand id matches no primary row.
    pub orphan_aggregates: usize,
    pub demands: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub demands: Vec<Demand>,
    pub aggregates: AggregateMap,
    pub stats: ReconcileStats,
}

/// Parses both sources, aggregates the work log, merges it into the primary
/// rows and normalizes the result. Without a work-log source the primary rows
/// are normalized as they are.
pub fn reconcile(
    primary_text: &str,
    logs_text: Option<&str>,
    options: &ReconcileOptions,
) -> Result<Reconciliation, ReconcileError> {
    let rows: Vec<PrimaryRow> = parse(primary_text).into_iter().map(PrimaryRow::from).collect();
    let mut stats = ReconcileStats {
        primary_rows: rows.len(),
        ..Default::default()
    };

    let aggregates = match logs_text {
        Some(text) => {
            let extraction = extract_work_log(&parse_table(text));
            stats.log_entries = extraction.entries.len();
            stats.skipped_log_rows = extraction.skipped;
            let entries = match &options.period {
                Some(period) => restrict_to_period(&extraction.entries, period),
                None => extraction.entries,
            };
            stats.counted_log_entries = entries.len();
            aggregate_with(&entries, &options.aggregate)
        }
        None if options.period.is_some() => {
            return Err(ReconcileError::Config(
                "a period restriction needs a work-log source".to_string(),
            ));
        }
        None => AggregateMap::new(),
    };
    stats.aggregated_demands = aggregates.len();

    let mut merged = merge(&rows, &aggregates);
    stats.merged_rows = merged.iter().filter(|r| r.aggregate_detail.is_some()).count();
    let primary_ids: BTreeSet<String> = rows
        .iter()
        .filter_map(|r| primary_identifier(&r.fields))
        .collect();
    stats.orphan_aggregates = aggregates.keys().filter(|id| !primary_ids.contains(*id)).count();
    if options.period.is_some() {
        merged.retain(|row| row.aggregate_detail.is_some());
    }

    let demands = try_normalize_all(merged.into_iter().map(DemandInput::from), &options.normalize)?;
    stats.demands = demands.len();
    info!(
        primary_rows = stats.primary_rows,
        log_entries = stats.log_entries,
        merged = stats.merged_rows,
        demands = stats.demands,
        "reconciliation finished"
    );

    Ok(Reconciliation {
        demands,
        aggregates,
        stats,
    })
}
