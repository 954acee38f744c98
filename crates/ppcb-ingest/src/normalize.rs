//! Row and batch normalization into canonical [`Demand`] records.

use ppcb_core::{Demand, DemandInput, PrimaryRow};
use tracing::debug;
use uuid::Uuid;

use crate::classify::{classify_category, classify_status, display_text, parse_hours};
use crate::columns::{primary, primary_identifier};
use crate::IngestError;

const SUBTITLE_DETAIL_CHARS: usize = 48;
const SUBTITLE_PLACEHOLDER: &str = "Demanda";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// When a row carries neither `id` nor the PRP id, mint a random one.
    /// Such ids differ on every run.
    pub generate_missing_ids: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            generate_missing_ids: true,
        }
    }
}

/// Normalizes one row, minting a random id when the row has none.
pub fn normalize_row(row: &PrimaryRow) -> Demand {
    let id = primary_identifier(&row.fields).unwrap_or_else(generated_id);
    build_demand(row, id)
}

pub fn try_normalize_row(
    row: &PrimaryRow,
    row_index: usize,
    options: &NormalizeOptions,
) -> Result<Demand, IngestError> {
    let id = match primary_identifier(&row.fields) {
        Some(id) => id,
        None if options.generate_missing_ids => generated_id(),
        None => return Err(IngestError::MissingIdentifier { row_index }),
    };
    Ok(build_demand(row, id))
}

/// Canonical records pass through untouched; rows are normalized.
pub fn normalize_all(inputs: impl IntoIterator<Item = DemandInput>) -> Vec<Demand> {
    inputs
        .into_iter()
        .map(|input| match input {
            DemandInput::Demand(demand) => demand,
            DemandInput::Row(row) => normalize_row(&row),
        })
        .collect()
}

pub fn try_normalize_all(
    inputs: impl IntoIterator<Item = DemandInput>,
    options: &NormalizeOptions,
) -> Result<Vec<Demand>, IngestError> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(row_index, input)| match input {
            DemandInput::Demand(demand) => Ok(demand),
            DemandInput::Row(row) => try_normalize_row(&row, row_index, options),
        })
        .collect()
}

fn generated_id() -> String {
    let id = Uuid::new_v4().to_string();
    debug!(%id, "row has no identifier; generated one");
    id
}

fn build_demand(row: &PrimaryRow, id: String) -> Demand {
    let fields = &row.fields;
    let text = |key: &str| display_text(fields.get(key));

    let client = Some(text(primary::NOME_CLIENTE))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| text(primary::CONTATO_CLIENTE));
    let title = if client.is_empty() {
        text(primary::AREA_SOLICITANTE)
    } else {
        client
    };

    let subtitle = [
        text(primary::SISTEMA_ESCOPO),
        text(primary::DETALHE_ESCOPO)
            .chars()
            .take(SUBTITLE_DETAIL_CHARS)
            .collect(),
        text(primary::PRP_ID),
    ]
    .into_iter()
    .find(|s| !s.is_empty())
    .unwrap_or_else(|| SUBTITLE_PLACEHOLDER.to_string());

    let (hours_adm, hours_total) = match &row.aggregate_detail {
        Some(agg) => (agg.hours_adm_total, agg.hours_total),
        None => (
            parse_hours(&text(primary::HORAS_ADM)),
            parse_hours(&text(primary::HORAS)),
        ),
    };

    let observed = row
        .aggregate_detail
        .as_ref()
        .filter(|agg| agg.date_start.is_some())
        .map(|agg| (agg.date_start.clone(), agg.date_end.clone()));
    let (date_start, date_end) = observed.unwrap_or_else(|| {
        (
            non_empty(text(primary::DATA_INICIO)),
            non_empty(text(primary::DATA_CONCLUSAO)),
        )
    });

    Demand {
        id,
        category: classify_category(fields),
        status: classify_status(&text(primary::STATUS)),
        title,
        subtitle,
        hours_adm,
        hours_total,
        responsible: text(primary::RESPONSAVEL_DEMANDA),
        date_start,
        date_end,
        raw_fields: fields.clone(),
        aggregate_detail: row.aggregate_detail.clone(),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppcb_core::{Category, Collaborator, DemandAggregate, RawRow, Status};
    use proptest::prelude::*;

    fn row(pairs: &[(&str, &str)]) -> PrimaryRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<RawRow>()
            .into()
    }

    #[test]
    fn derives_display_fields_with_fallbacks() {
        let demand = normalize_row(&row(&[
            ("id", "7"),
            (primary::STATUS, "Doing"),
            (primary::CYBERSECURITY, "x"),
            (primary::CONTATO_CLIENTE, "Maria (Financeiro)"),
            (primary::AREA_SOLICITANTE, "Financeiro"),
            (
                primary::DETALHE_ESCOPO,
                "Revisão completa dos acessos privilegiados ao ERP e ao banco de dados",
            ),
            (primary::RESPONSAVEL_DEMANDA, " Ana Souza "),
            (primary::HORAS_ADM, "10,5"),
            (primary::HORAS, "1.200"),
            (primary::DATA_INICIO, "2026-01-05"),
        ]));

        assert_eq!(demand.id, "7");
        assert_eq!(demand.status, Status::EmAndamento);
        assert_eq!(demand.category, Category::Cyber);
        assert_eq!(demand.title, "Maria (Financeiro)");
        assert_eq!(demand.subtitle, "Revisão completa dos acessos privilegiados ao ER");
        assert_eq!(demand.subtitle.chars().count(), 48);
        assert_eq!(demand.responsible, "Ana Souza");
        assert_eq!(demand.hours_adm, 10.5);
        assert_eq!(demand.hours_total, 1200.0);
        assert_eq!(demand.date_start.as_deref(), Some("2026-01-05"));
        assert_eq!(demand.date_end, None);
        assert!(demand.raw_fields[primary::DETALHE_ESCOPO].chars().count() > 48);
    }

    #[test]
    fn subtitle_and_title_defaults() {
        let demand = normalize_row(&row(&[("id", "1"), (primary::PRP_ID, "PRP-9")]));
        assert_eq!(demand.title, "");
        assert_eq!(demand.subtitle, "PRP-9");

        let demand = normalize_row(&row(&[("id", "1"), (primary::SISTEMA_ESCOPO, "SAP")]));
        assert_eq!(demand.subtitle, "SAP");

        let demand = normalize_row(&row(&[("id", "1")]));
        assert_eq!(demand.subtitle, "Demanda");
        assert_eq!(demand.status, Status::Backlog);
        assert_eq!(demand.category, Category::Outros);
        assert_eq!(demand.hours_adm, 0.0);
    }

    #[test]
    fn aggregate_overrides_hours_and_dates() {
        let mut r = row(&[
            ("id", "7"),
            (primary::HORAS_ADM, "99"),
            (primary::DATA_INICIO, "01/01/2026"),
        ]);
        let mut collaborator = Collaborator::new("Ana", "Trainee");
        collaborator.hours_adm = 12.0;
        collaborator.hours_project = 3.0;
        collaborator.hours_total = 15.0;
        r.aggregate_detail = Some(DemandAggregate {
            hours_adm_total: 12.0,
            hours_project_total: 3.0,
            hours_total: 15.0,
            date_start: Some("2026-02-01".into()),
            date_end: Some("2026-02-20".into()),
            collaborators: vec![collaborator],
            entry_count: 2,
        });

        let demand = normalize_row(&r);
        assert_eq!(demand.hours_adm, 12.0);
        assert_eq!(demand.hours_total, 15.0);
        assert_eq!(demand.date_start.as_deref(), Some("2026-02-01"));
        assert_eq!(demand.date_end.as_deref(), Some("2026-02-20"));
        assert_eq!(demand.aggregate_detail, r.aggregate_detail);
    }

    #[test]
    fn aggregate_without_dates_keeps_scheduled_dates() {
        let mut r = row(&[("id", "7"), (primary::DATA_INICIO, "01/01/2026")]);
        r.aggregate_detail = Some(DemandAggregate::default());
        let demand = normalize_row(&r);
        assert_eq!(demand.date_start.as_deref(), Some("01/01/2026"));
    }

    #[test]
    fn missing_ids_are_generated_unless_disabled() {
        let r = row(&[(primary::STATUS, "done")]);
        let a = normalize_row(&r);
        let b = normalize_row(&r);
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);

        let strict = NormalizeOptions {
            generate_missing_ids: false,
        };
        let inputs = vec![DemandInput::from(row(&[("id", "1")])), DemandInput::from(r)];
        let err = try_normalize_all(inputs, &strict).unwrap_err();
        assert!(matches!(err, IngestError::MissingIdentifier { row_index: 1 }));
    }

    #[test]
    fn canonical_records_pass_through() {
        let demand = normalize_row(&row(&[("id", "3"), (primary::STATUS, "done")]));
        let mut edited = demand.clone();
        edited.status = Status::Cancelada;

        let out = normalize_all(vec![DemandInput::from(edited.clone())]);
        assert_eq!(out, vec![edited]);
    }

    fn raw_row_strategy() -> impl Strategy<Value = RawRow> {
        let keys = prop::sample::select(vec![
            "id",
            primary::PRP_ID,
            primary::STATUS,
            primary::INTELIDADOS,
            primary::TIPO_DEMANDA,
            primary::NOME_CLIENTE,
            primary::HORAS_ADM,
            primary::HORAS,
            primary::DATA_INICIO,
        ]);
        prop::collection::btree_map(keys.prop_map(String::from), "[A-Za-z0-9,. ]{0,8}", 0..8)
    }

    proptest! {
        #[test]
        fn normalizing_twice_is_a_no_op(rows in prop::collection::vec(raw_row_strategy(), 0..6)) {
            let once = normalize_all(rows.into_iter().map(DemandInput::from));
            let twice = normalize_all(once.clone().into_iter().map(DemandInput::from));
            prop_assert_eq!(once, twice);
        }
    }
}
