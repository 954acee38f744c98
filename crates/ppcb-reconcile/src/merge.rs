//! Reconciliation of primary rows with their work-log aggregates.
//!
//! The aggregate wins for hour totals and role assignments. Everything else in
//! the primary row is carried over untouched.

use ppcb_core::{AggregateMap, Collaborator, DemandAggregate, PrimaryRow};
use ppcb_ingest::columns::primary;
use ppcb_ingest::{format_locale_number, primary_identifier, role_slot_for, RoleSlot, ROLE_SLOTS};
use tracing::{debug, info};

/// Merges every primary row with the aggregate sharing its identifier. Rows
/// without an aggregate are returned as they came in.
pub fn merge(rows: &[PrimaryRow], aggregates: &AggregateMap) -> Vec<PrimaryRow> {
    let mut merged_count = 0usize;
    let merged: Vec<PrimaryRow> = rows
        .iter()
        .map(|row| {
            let aggregate = primary_identifier(&row.fields).and_then(|id| aggregates.get(&id));
            match aggregate {
                Some(aggregate) => {
                    merged_count += 1;
                    merge_row(row, aggregate)
                }
                None => row.clone(),
            }
        })
        .collect();

    info!(
        rows = rows.len(),
        merged = merged_count,
        aggregates = aggregates.len(),
        "merged primary rows with work-log aggregates"
    );
    merged
}

/// One row with one aggregate. Role slots are emptied before they are filled,
/// so merging an already merged row gives the same result.
pub fn merge_row(row: &PrimaryRow, aggregate: &DemandAggregate) -> PrimaryRow {
    let mut fields = row.fields.clone();
    fields.insert(
        primary::HORAS_ADM.to_string(),
        format_locale_number(aggregate.hours_adm_total),
    );
    fields.insert(
        primary::HORAS.to_string(),
        format_locale_number(aggregate.hours_total),
    );

    for slot in ROLE_SLOTS {
        for column in slot_columns(slot) {
            fields.insert(column.to_string(), String::new());
        }
    }

    let mut filled: Vec<&'static str> = Vec::new();
    for collaborator in ranked(&aggregate.collaborators) {
        match role_slot_for(&collaborator.role) {
            Some(slot) if !filled.contains(&slot.role) => {
                filled.push(slot.role);
                fields.insert(slot.person_column.to_string(), collaborator.name.clone());
                fields.insert(
                    slot.project_hours_column.to_string(),
                    format_locale_number(collaborator.hours_project),
                );
                fields.insert(
                    slot.adm_hours_column.to_string(),
                    format_locale_number(collaborator.hours_adm),
                );
            }
            Some(slot) => debug!(
                name = %collaborator.name,
                role = slot.role,
                "role slot already taken by a collaborator with more hours"
            ),
            None => debug!(
                name = %collaborator.name,
                role = %collaborator.role,
                "role has no slot; kept only in the aggregate detail"
            ),
        }
    }

    PrimaryRow {
        fields,
        aggregate_detail: Some(aggregate.clone()),
    }
}

fn slot_columns(slot: &RoleSlot) -> [&'static str; 3] {
    [
        slot.person_column,
        slot.project_hours_column,
        slot.adm_hours_column,
    ]
}

/// Collaborators by descending total hours; ties keep aggregate order.
fn ranked(collaborators: &[Collaborator]) -> Vec<&Collaborator> {
    let mut ranked: Vec<&Collaborator> = collaborators.iter().collect();
    ranked.sort_by(|a, b| b.hours_total.total_cmp(&a.hours_total));
    ranked
}
