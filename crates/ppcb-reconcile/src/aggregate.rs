//! Work-log extraction and per-demand aggregation.

use std::collections::BTreeMap;

use ppcb_core::{AggregateMap, Collaborator, DemandAggregate, HourKind, WorkLogEntry};
use ppcb_ingest::{classify_hour_kind, parse_hours, LogColumns, Table};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::period::parse_log_date;

/// How the observed date range of a demand is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrdering {
    /// Plain string order. Only correct for zero-padded ISO dates, kept as the
    /// default because existing reports were produced this way.
    #[default]
    Lexical,
    /// Calendar order of parsed dates; unparseable values sort last, lexically.
    Calendar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregateOptions {
    pub date_ordering: DateOrdering,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogExtraction {
    pub columns: LogColumns,
    pub entries: Vec<WorkLogEntry>,
    /// Rows dropped because no demand id could be read from them.
    pub skipped: usize,
}

/// Turns a parsed complementary source into work-log entries. Headers are
/// resolved once for the whole table.
pub fn extract_work_log(table: &Table) -> LogExtraction {
    let columns = LogColumns::resolve(&table.headers);
    let mut entries = Vec::with_capacity(table.rows.len());
    let mut skipped = 0usize;

    for row in &table.rows {
        let cell = |column: &Option<String>| LogColumns::value(row, column).trim().to_string();
        let demand_id = cell(&columns.demand_id);
        if demand_id.is_empty() {
            skipped += 1;
            continue;
        }
        entries.push(WorkLogEntry {
            demand_id,
            date: cell(&columns.date),
            hours: parse_hours(LogColumns::value(row, &columns.hours)),
            hour_kind: classify_hour_kind(LogColumns::value(row, &columns.hour_kind)),
            collaborator_name: cell(&columns.collaborator),
            responsibility_role: cell(&columns.role),
        });
    }

    if skipped > 0 {
        debug!(skipped, "work-log rows without a demand id were skipped");
    }
    LogExtraction {
        columns,
        entries,
        skipped,
    }
}

pub fn aggregate(entries: &[WorkLogEntry]) -> AggregateMap {
    aggregate_with(entries, &AggregateOptions::default())
}

struct Group<'a> {
    aggregate: DemandAggregate,
    dates: Vec<&'a str>,
}

pub fn aggregate_with(entries: &[WorkLogEntry], options: &AggregateOptions) -> AggregateMap {
    let mut groups: BTreeMap<&str, Group<'_>> = BTreeMap::new();
    let mut skipped = 0usize;

    for entry in entries {
        let key = entry.demand_id.trim();
        if key.is_empty() {
            skipped += 1;
            continue;
        }
        let group = groups.entry(key).or_insert_with(|| Group {
            aggregate: DemandAggregate::default(),
            dates: Vec::new(),
        });
        let agg = &mut group.aggregate;
        agg.entry_count += 1;
        match entry.hour_kind {
            HourKind::Adm => agg.hours_adm_total += entry.hours,
            HourKind::Project => agg.hours_project_total += entry.hours,
        }
        agg.hours_total += entry.hours;

        let position = agg.collaborators.iter().position(|c| {
            c.name == entry.collaborator_name && c.role == entry.responsibility_role
        });
        let collaborator = match position {
            Some(i) => &mut agg.collaborators[i],
            None => {
                agg.collaborators.push(Collaborator::new(
                    entry.collaborator_name.as_str(),
                    entry.responsibility_role.as_str(),
                ));
                let last = agg.collaborators.len() - 1;
                &mut agg.collaborators[last]
            }
        };
        collaborator.add_hours(entry.hour_kind, entry.hours);

        let date = entry.date.trim();
        if !date.is_empty() {
            group.dates.push(date);
        }
    }

    if skipped > 0 {
        debug!(skipped, "work-log entries without a demand id were ignored");
    }

    let aggregates: AggregateMap = groups
        .into_iter()
        .map(|(key, mut group)| {
            sort_dates(&mut group.dates, options.date_ordering);
            group.aggregate.date_start = group.dates.first().map(|d| d.to_string());
            group.aggregate.date_end = group.dates.last().map(|d| d.to_string());
            (key.to_string(), group.aggregate)
        })
        .collect();

    info!(
        entries = entries.len(),
        demands = aggregates.len(),
        "aggregated work-log entries"
    );
    aggregates
}

fn sort_dates(dates: &mut [&str], ordering: DateOrdering) {
    match ordering {
        DateOrdering::Lexical => dates.sort_unstable(),
        DateOrdering::Calendar => dates.sort_by_cached_key(|raw| {
            let parsed = parse_log_date(raw);
            (parsed.is_none(), parsed, raw.to_string())
        }),
    }
}
