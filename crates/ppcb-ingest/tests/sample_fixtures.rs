use std::path::Path;

use ppcb_core::{Category, DemandInput, PrimaryRow, Status};
use ppcb_ingest::{normalize_all, parse_bytes, parse_table, LogColumns};

fn read_fixture(relative: &str) -> Vec<u8> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures");
    std::fs::read(root.join(relative)).unwrap()
}

#[test]
fn sample_demands_normalize() {
    let rows = parse_bytes(&read_fixture("demandas/sample/demandas.csv")).unwrap();
    assert_eq!(rows.len(), 5);

    let demands = normalize_all(rows.into_iter().map(PrimaryRow::from).map(DemandInput::from));
    let summary: Vec<(&str, Category, Status)> = demands
        .iter()
        .map(|d| (d.id.as_str(), d.category, d.status))
        .collect();
    assert_eq!(
        summary,
        [
            ("101", Category::Cyber, Status::EmAndamento),
            ("102", Category::Intelidados, Status::Backlog),
            ("103", Category::AuditoriaTi, Status::Concluida),
            ("PRP-2026-004", Category::ConsulTi, Status::EmAndamento),
            ("105", Category::Outros, Status::Cancelada),
        ]
    );
    assert_eq!(demands[0].hours_adm, 10.5);
    assert_eq!(demands[3].hours_adm, 1200.5);
    assert_eq!(
        demands[2].raw("Detalhe da demanda (Escopo)"),
        "Revisão de perfis \"críticos\" no ERP, com evidências"
    );
}

#[test]
fn sample_work_log_headers_resolve() {
    let text = String::from_utf8(read_fixture("apontamentos/sample/apontamentos.csv")).unwrap();
    let table = parse_table(&text);
    let columns = LogColumns::resolve(&table.headers);
    assert_eq!(columns.demand_id.as_deref(), Some("ID Demanda"));
    assert_eq!(columns.hour_kind.as_deref(), Some("Tipo da hora"));
    assert_eq!(columns.collaborator.as_deref(), Some("Nome colaborador"));
    assert_eq!(columns.role.as_deref(), Some("Responsabilidade"));
    assert_eq!(table.rows.len(), 8);
}
