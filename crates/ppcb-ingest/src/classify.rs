//! Pure mappings from free-text spreadsheet values to canonical values.
//!
//! Every function here degrades instead of failing: unknown statuses land in
//! the backlog, unknown categories in `OUTROS`, and malformed numbers read as
//! zero so one bad cell never aborts an import.

use ppcb_core::{Category, HourKind, RawRow, Status};

use crate::columns::primary;

const STATUS_SYNONYMS: &[(Status, &[&str])] = &[
    (
        Status::EmAvaliacao,
        &["em avaliação", "em avaliacao", "avaliacao", "avaliação", "analise", "análise"],
    ),
    (Status::Backlog, &["backlog", "to do", "todo", "a fazer", "fila"]),
    (
        Status::EmAndamento,
        &[
            "em andamento",
            "andamento",
            "doing",
            "in progress",
            "progresso",
            "fazendo",
            "execução",
            // blocked work stays on the in-progress column
            "bloqueado",
            "blocked",
            "impedido",
            // so does anything under test or review
            "teste",
            "testing",
            "qa",
            "homologação",
            "homologacao",
            "revisão",
        ],
    ),
    (
        Status::Concluida,
        &["concluído", "concluido", "done", "finalizado", "entregue", "concluída", "concluida"],
    ),
    (Status::Cancelada, &["cancelado", "dismissed", "descartado", "cancelada"]),
];

/// Indicator columns in priority order; the first non-blank one decides.
const CATEGORY_INDICATORS: &[(Category, &str)] = &[
    (Category::Intelidados, primary::INTELIDADOS),
    (Category::Cyber, primary::CYBERSECURITY),
    (Category::AuditoriaTi, primary::AUDITORIA_TI),
    (Category::ConsulTi, primary::CONSULTORIA_TI),
    (Category::DemandaInt, primary::DEMANDA_INTERNA),
    (Category::Outros, primary::OUTROS),
];

const DEMAND_TYPE_KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Intelidados, &["intel"]),
    (Category::Cyber, &["cyber"]),
    (Category::AuditoriaTi, &["aud"]),
    (Category::ConsulTi, &["consul"]),
    (Category::DemandaInt, &["interna", "ppc"]),
];

const ADM_TOKENS: &[&str] = &["adm"];

pub fn classify_status(raw: &str) -> Status {
    let needle = raw.trim().to_lowercase();
    STATUS_SYNONYMS
        .iter()
        .find(|(_, synonyms)| synonyms.contains(&needle.as_str()))
        .map(|(status, _)| *status)
        .unwrap_or(Status::Backlog)
}

pub fn classify_category(row: &RawRow) -> Category {
    for (category, column) in CATEGORY_INDICATORS {
        if !display_text(row.get(*column)).is_empty() {
            return *category;
        }
    }

    let demand_type = display_text(row.get(primary::TIPO_DEMANDA)).to_lowercase();
    DEMAND_TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| demand_type.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Outros)
}

/// Reads Brazilian-formatted numbers: `.` groups thousands, `,` marks the
/// decimal. Any other character is stripped before conversion.
pub fn parse_locale_number(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .replace('.', "")
        .replacen(',', ".", 1)
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Hours never go negative; a stray minus sign reads as zero.
pub fn parse_hours(raw: &str) -> f64 {
    parse_locale_number(raw).max(0.0)
}

/// Inverse of [`parse_locale_number`] for values written back into rows:
/// no grouping, `,` as the decimal mark.
pub fn format_locale_number(value: f64) -> String {
    format!("{value}").replace('.', ",")
}

pub fn classify_hour_kind(raw: &str) -> HourKind {
    let lower = raw.to_lowercase();
    if ADM_TOKENS.iter().any(|t| lower.contains(t)) {
        HourKind::Adm
    } else {
        HourKind::Project
    }
}

/// Trimmed display value of an optional cell; absent cells read as empty.
pub fn display_text(value: Option<&String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}
