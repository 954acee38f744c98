//! Core demand model shared by the ingest and reconcile crates.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CRATE_NAME: &str = "ppcb-core";

/// One source row keyed by trimmed header text. A duplicated header keeps the
/// value of its last occurrence.
pub type RawRow = BTreeMap<String, String>;

/// Per-demand aggregates keyed by the foreign demand identifier.
pub type AggregateMap = BTreeMap<String, DemandAggregate>;

/// Board column a demand sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    EmAvaliacao,
    Backlog,
    EmAndamento,
    Concluida,
    Cancelada,
}

impl Status {
    /// Board order, left to right.
    pub const ALL: [Status; 5] = [
        Status::EmAvaliacao,
        Status::Backlog,
        Status::EmAndamento,
        Status::Concluida,
        Status::Cancelada,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Status::EmAvaliacao => "EM_AVALIACAO",
            Status::Backlog => "BACKLOG",
            Status::EmAndamento => "EM_ANDAMENTO",
            Status::Concluida => "CONCLUIDA",
            Status::Cancelada => "CANCELADA",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::EmAvaliacao => "Em Avaliação",
            Status::Backlog => "Backlog",
            Status::EmAndamento => "Em Andamento",
            Status::Concluida => "Concluída",
            Status::Cancelada => "Cancelada",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Strict parse for commands: accepts a canonical code or a board label.
/// Free-text classification with a fallback lives in `ppcb-ingest`.
impl FromStr for Status {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Status::ALL
            .into_iter()
            .find(|status| {
                status.code().eq_ignore_ascii_case(wanted)
                    || status.label().to_lowercase() == wanted.to_lowercase()
            })
            .ok_or_else(|| ModelError::UnknownStatus(wanted.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Intelidados,
    Cyber,
    AuditoriaTi,
    ConsulTi,
    DemandaInt,
    Outros,
}

impl Category {
    /// Priority order used when several indicator columns are populated.
    pub const ALL: [Category; 6] = [
        Category::Intelidados,
        Category::Cyber,
        Category::AuditoriaTi,
        Category::ConsulTi,
        Category::DemandaInt,
        Category::Outros,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Category::Intelidados => "INTELIDADOS",
            Category::Cyber => "CYBER",
            Category::AuditoriaTi => "AUDITORIA_TI",
            Category::ConsulTi => "CONSUL_TI",
            Category::DemandaInt => "DEMANDA_INT",
            Category::Outros => "OUTROS",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Intelidados => "INTELIDADOS",
            Category::Cyber => "CYBER",
            Category::AuditoriaTi => "AUDITORIA TI",
            Category::ConsulTi => "CONSUL. TI",
            Category::DemandaInt => "DEMANDA INT.",
            Category::Outros => "OUTROS",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|category| {
                category.code().eq_ignore_ascii_case(wanted)
                    || category.label().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| ModelError::UnknownCategory(wanted.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HourKind {
    Adm,
    Project,
}

/// One complementary-source row after column resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkLogEntry {
    pub demand_id: String,
    pub date: String,
    pub hours: f64,
    pub hour_kind: HourKind,
    pub collaborator_name: String,
    pub responsibility_role: String,
}

/// Hours booked by one person under one role on a single demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collaborator {
    pub name: String,
    pub role: String,
    pub hours_adm: f64,
    pub hours_project: f64,
    pub hours_total: f64,
}

impl Collaborator {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            hours_adm: 0.0,
            hours_project: 0.0,
            hours_total: 0.0,
        }
    }

    pub fn add_hours(&mut self, kind: HourKind, hours: f64) {
        match kind {
            HourKind::Adm => self.hours_adm += hours,
            HourKind::Project => self.hours_project += hours,
        }
        self.hours_total += hours;
    }
}

/// Rollup of every work-log entry sharing one demand identifier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DemandAggregate {
    pub hours_adm_total: f64,
    pub hours_project_total: f64,
    pub hours_total: f64,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub collaborators: Vec<Collaborator>,
    pub entry_count: usize,
}

/// A primary-source row, possibly already reconciled against its aggregate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrimaryRow {
    pub fields: RawRow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_detail: Option<DemandAggregate>,
}

impl PrimaryRow {
    pub fn field(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or_default()
    }
}

impl From<RawRow> for PrimaryRow {
    fn from(fields: RawRow) -> Self {
        Self {
            fields,
            aggregate_detail: None,
        }
    }
}

/// Canonical demand record handed to presentation and dashboard consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demand {
    pub id: String,
    pub category: Category,
    pub status: Status,
    pub title: String,
    pub subtitle: String,
    pub hours_adm: f64,
    pub hours_total: f64,
    pub responsible: String,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub raw_fields: RawRow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_detail: Option<DemandAggregate>,
}

impl Demand {
    pub fn raw(&self, key: &str) -> &str {
        self.raw_fields
            .get(key)
            .map(|v| v.trim())
            .unwrap_or_default()
    }

    /// Two-letter avatar text: first and last word initials, or the first two
    /// letters of a single word. `—` when nobody is responsible.
    pub fn responsible_initials(&self) -> String {
        let parts: Vec<&str> = self.responsible.split_whitespace().collect();
        let Some(first) = parts.first() else {
            return "—".to_string();
        };
        let mut out: String = first.chars().take(1).flat_map(char::to_uppercase).collect();
        let second = if parts.len() > 1 {
            parts[parts.len() - 1].chars().next()
        } else {
            first.chars().nth(1)
        };
        out.extend(second.into_iter().flat_map(char::to_uppercase));
        out.chars().take(2).collect()
    }
}

/// Input to the batch normalizer. Records returning from an external store are
/// already canonical; freshly parsed or merged rows are not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum DemandInput {
    Row(PrimaryRow),
    Demand(Demand),
}

impl From<PrimaryRow> for DemandInput {
    fn from(row: PrimaryRow) -> Self {
        DemandInput::Row(row)
    }
}

impl From<RawRow> for DemandInput {
    fn from(row: RawRow) -> Self {
        DemandInput::Row(row.into())
    }
}

impl From<Demand> for DemandInput {
    fn from(demand: Demand) -> Self {
        DemandInput::Demand(demand)
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown status `{0}`")]
    UnknownStatus(String),
    #[error("unknown category `{0}`")]
    UnknownCategory(String),
}

/// Status change requested by a consumer (e.g. a card moved between columns).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub demand_id: String,
    pub status: Status,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistEntry {
    pub demand_id: String,
    pub text: String,
    pub done: bool,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command has an empty demand id")]
    EmptyDemandId,
    #[error("checklist entry for demand {0} has no text")]
    EmptyChecklistText(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// Outbound side of the command contract. The engine holds no state of its
/// own; implementations forward commands to whatever store owns the records.
pub trait CommandSink {
    fn update_status(&mut self, update: &StatusUpdate) -> Result<(), CommandError>;
    fn add_checklist_entry(&mut self, entry: &ChecklistEntry) -> Result<(), CommandError>;
}

#[derive(Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum CommandRecord<'a> {
    UpdateStatus(&'a StatusUpdate),
    AddChecklistEntry(&'a ChecklistEntry),
}

/// Writes each command as one JSON object per line.
pub struct JsonLinesCommandSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesCommandSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, record: &CommandRecord<'_>) -> Result<(), CommandError> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> CommandSink for JsonLinesCommandSink<W> {
    fn update_status(&mut self, update: &StatusUpdate) -> Result<(), CommandError> {
        if update.demand_id.trim().is_empty() {
            return Err(CommandError::EmptyDemandId);
        }
        self.emit(&CommandRecord::UpdateStatus(update))
    }

    fn add_checklist_entry(&mut self, entry: &ChecklistEntry) -> Result<(), CommandError> {
        if entry.demand_id.trim().is_empty() {
            return Err(CommandError::EmptyDemandId);
        }
        if entry.text.trim().is_empty() {
            return Err(CommandError::EmptyChecklistText(entry.demand_id.clone()));
        }
        self.emit(&CommandRecord::AddChecklistEntry(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn demand_with_responsible(responsible: &str) -> Demand {
        Demand {
            id: "1".into(),
            category: Category::Outros,
            status: Status::Backlog,
            title: String::new(),
            subtitle: "Demanda".into(),
            hours_adm: 0.0,
            hours_total: 0.0,
            responsible: responsible.into(),
            date_start: None,
            date_end: None,
            raw_fields: RawRow::new(),
            aggregate_detail: None,
        }
    }

    #[test]
    fn status_parses_codes_and_labels() {
        assert_eq!("EM_ANDAMENTO".parse::<Status>().unwrap(), Status::EmAndamento);
        assert_eq!("em avaliação".parse::<Status>().unwrap(), Status::EmAvaliacao);
        assert_eq!(" Concluída ".parse::<Status>().unwrap(), Status::Concluida);
        assert!(matches!(
            "doing".parse::<Status>(),
            Err(ModelError::UnknownStatus(s)) if s == "doing"
        ));
    }

    #[test]
    fn category_parses_codes_and_labels() {
        assert_eq!("consul_ti".parse::<Category>().unwrap(), Category::ConsulTi);
        assert_eq!("Demanda Int.".parse::<Category>().unwrap(), Category::DemandaInt);
        assert!("cyber security".parse::<Category>().is_err());
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json.trim_matches('"'), category.code());
        }
    }

    #[test]
    fn enums_serialize_as_canonical_codes() {
        assert_eq!(serde_json::to_string(&Category::ConsulTi).unwrap(), "\"CONSUL_TI\"");
        assert_eq!(serde_json::to_string(&Category::AuditoriaTi).unwrap(), "\"AUDITORIA_TI\"");
        assert_eq!(serde_json::to_string(&Status::EmAvaliacao).unwrap(), "\"EM_AVALIACAO\"");
        assert_eq!(serde_json::to_string(&HourKind::Adm).unwrap(), "\"ADM\"");
    }

    #[test]
    fn initials_follow_first_and_last_word() {
        assert_eq!(demand_with_responsible("ana maria souza").responsible_initials(), "AS");
        assert_eq!(demand_with_responsible("Bruno").responsible_initials(), "BR");
        assert_eq!(demand_with_responsible("  ").responsible_initials(), "—");
        assert_eq!(demand_with_responsible("É").responsible_initials(), "É");
    }

    #[test]
    fn collaborator_tracks_kind_split() {
        let mut c = Collaborator::new("Ana", "Trainee");
        c.add_hours(HourKind::Adm, 4.0);
        c.add_hours(HourKind::Project, 6.0);
        assert_eq!(c.hours_adm, 4.0);
        assert_eq!(c.hours_project, 6.0);
        assert_eq!(c.hours_total, 10.0);
    }

    #[test]
    fn demand_input_is_explicitly_tagged() {
        let mut fields = RawRow::new();
        fields.insert("id".into(), "7".into());
        let row = DemandInput::from(fields);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["kind"], "row");
        assert_eq!(json["record"]["fields"]["id"], "7");

        let demand = DemandInput::from(demand_with_responsible("Ana"));
        let json = serde_json::to_string(&demand).unwrap();
        let back: DemandInput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, demand);
    }

    #[test]
    fn json_lines_sink_writes_one_command_per_line() {
        let issued_at = Utc.with_ymd_and_hms(2026, 2, 13, 10, 0, 0).single().unwrap();
        let mut sink = JsonLinesCommandSink::new(Vec::new());
        sink.update_status(&StatusUpdate {
            demand_id: "42".into(),
            status: Status::Concluida,
            issued_at,
        })
        .unwrap();
        sink.add_checklist_entry(&ChecklistEntry {
            demand_id: "42".into(),
            text: "Revisar escopo".into(),
            done: false,
            issued_at,
        })
        .unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["command"], "update_status");
        assert_eq!(lines[0]["status"], "CONCLUIDA");
        assert_eq!(lines[1]["command"], "add_checklist_entry");
        assert_eq!(lines[1]["text"], "Revisar escopo");
    }

    #[test]
    fn sink_rejects_blank_commands() {
        let issued_at = Utc::now();
        let mut sink = JsonLinesCommandSink::new(Vec::new());
        let err = sink
            .update_status(&StatusUpdate {
                demand_id: " ".into(),
                status: Status::Backlog,
                issued_at,
            })
            .unwrap_err();
        assert!(matches!(err, CommandError::EmptyDemandId));
        let err = sink
            .add_checklist_entry(&ChecklistEntry {
                demand_id: "1".into(),
                text: "".into(),
                done: false,
                issued_at,
            })
            .unwrap_err();
        assert!(matches!(err, CommandError::EmptyChecklistText(_)));
        assert!(sink.into_inner().is_empty());
    }
}
