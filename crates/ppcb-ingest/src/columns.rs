//! Column vocabulary for both sources and header resolution.
//!
//! Header matching is exact after trimming and lower-casing, walked through an
//! ordered candidate list; the first candidate present in the header wins.

use ppcb_core::RawRow;
use strsim::jaro_winkler;
use tracing::{debug, warn};

/// Primary-source (one row per demand) column names.
pub mod primary {
    pub const ID_CANDIDATES: &[&str] = &["id"];
    pub const PRP_ID: &str = "ID - PRP (RentSoft)";
    pub const PLANNER_ID: &str = "IDPlanner";
    pub const STATUS: &str = "Status";

    pub const INTELIDADOS: &str = "Intelidados";
    pub const CYBERSECURITY: &str = "Cybersecurity";
    pub const AUDITORIA_TI: &str = "Auditoria TI";
    pub const CONSULTORIA_TI: &str = "Consultoria de TI";
    pub const DEMANDA_INTERNA: &str = "Demanda Interna (PPeC)";
    pub const OUTROS: &str = "Outros";
    pub const TIPO_DEMANDA: &str = "Tipo de Demanda";

    pub const RESPONSAVEL_DEMANDA: &str = "Responsável Demanda";
    pub const NOME_CLIENTE: &str = "Nome Cliente";
    pub const CONTATO_CLIENTE: &str = "Contato Cliente";
    pub const AREA_SOLICITANTE: &str = "Área Solicitante";
    pub const SISTEMA_ESCOPO: &str = "Sistema em Escopo";
    pub const DETALHE_ESCOPO: &str = "Detalhe da demanda (Escopo)";

    pub const HORAS_ADM: &str = "Horas ADM";
    pub const HORAS: &str = "Horas";
    pub const DATA_INICIO: &str = "Data Início (Previsão)";
    pub const DATA_CONCLUSAO: &str = "Data Conclusão (Previsão)";
}

/// Complementary-source (one row per work-log entry) header candidates.
pub mod work_log {
    pub const DEMAND_ID: &[&str] = &[
        "ID Demanda",
        "Demanda ID",
        "id_demanda",
        "demanda_id",
        "ID da Demanda",
        "Demanda",
        "id",
    ];
    pub const DATE: &[&str] = &["Data", "Data Apontamento", "Data do Apontamento", "Date"];
    pub const HOURS: &[&str] = &["Horas", "Horas Apontadas", "Qtd Horas", "Hours"];
    pub const HOUR_KIND: &[&str] = &["Tipo da hora", "Tipo de Hora", "Tipo Hora", "Hour Type"];
    pub const COLLABORATOR: &[&str] = &[
        "Nome colaborador",
        "Nome do Colaborador",
        "Colaborador",
        "Collaborator",
    ];
    pub const ROLE: &[&str] = &["Responsabilidade", "Papel", "Função", "Funcao", "Role"];
}

/// A responsibility role and the primary-source columns it is flattened into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSlot {
    pub role: &'static str,
    pub aliases: &'static [&'static str],
    pub person_column: &'static str,
    pub project_hours_column: &'static str,
    pub adm_hours_column: &'static str,
}

impl RoleSlot {
    pub fn matches(&self, role: &str) -> bool {
        let role = role.trim().to_lowercase();
        std::iter::once(self.role)
            .chain(self.aliases.iter().copied())
            .any(|name| name.to_lowercase() == role)
    }
}

pub const ROLE_SLOTS: &[RoleSlot] = &[
    RoleSlot {
        role: "Responsável Demanda",
        aliases: &["Responsible Demand", "Responsavel Demanda"],
        person_column: primary::RESPONSAVEL_DEMANDA,
        project_hours_column: "Horas Projeto (Responsável Demanda)",
        adm_hours_column: "Horas Adm (Responsável Demanda)",
    },
    RoleSlot {
        role: "Trainee",
        aliases: &["Trainee do Projeto"],
        person_column: "Trainee do Projeto",
        project_hours_column: "Horas Projeto (Trainee)",
        adm_hours_column: "Horas Adm (Trainee)",
    },
    RoleSlot {
        role: "Responsável Cyber",
        aliases: &["Cyber Responsible", "Responsavel Cyber"],
        person_column: "Responsável Cyber",
        project_hours_column: "Horas Projeto (Cyber)",
        adm_hours_column: "Horas Adm (Cyber)",
    },
    RoleSlot {
        role: "Responsável Intelidados",
        aliases: &["Data Responsible", "Responsavel Intelidados"],
        person_column: "Responsável Intelidados",
        project_hours_column: "Horas Projeto (Intelidados)",
        adm_hours_column: "Horas Adm (Intelidados)",
    },
    RoleSlot {
        role: "Responsável Desenvolvimento",
        aliases: &["Dev Responsible", "Responsavel Desenvolvimento"],
        person_column: "Responsável Desenvolvimento",
        project_hours_column: "Horas Projeto (Desenvolvimento)",
        adm_hours_column: "Horas Adm (Desenvolvimento)",
    },
    RoleSlot {
        role: "Responsável Parceiro",
        aliases: &["Partner Responsible", "Responsavel Parceiro"],
        person_column: "Responsável Parceiro",
        project_hours_column: "Horas Projeto (Parceiro)",
        adm_hours_column: "Horas Adm (Parceiro)",
    },
    RoleSlot {
        role: "Gerente Responsável",
        aliases: &["Manager Responsible", "Gerente Responsavel"],
        person_column: "Gerente Responsável",
        project_hours_column: "Horas Projeto (Gerente)",
        adm_hours_column: "Horas Adm (Gerente)",
    },
];

pub fn role_slot_for(role: &str) -> Option<&'static RoleSlot> {
    ROLE_SLOTS.iter().find(|slot| slot.matches(role))
}

fn same_header(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// First candidate (in candidate order) present in `headers`, returned with
/// the header's own spelling.
pub fn resolve_column(headers: &[String], candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|candidate| {
        headers
            .iter()
            .find(|header| same_header(header, candidate))
            .cloned()
    })
}

/// Row-level variant of [`resolve_column`] for rows whose header list is not
/// at hand.
pub fn lookup<'a>(row: &'a RawRow, candidates: &[&str]) -> Option<&'a str> {
    candidates.iter().find_map(|candidate| {
        row.iter()
            .find(|(key, _)| same_header(key, candidate))
            .map(|(_, value)| value.as_str())
    })
}

/// The demand identifier of a primary row: the `id` column in any casing,
/// falling back to the PRP identifier. Blank values count as absent.
pub fn primary_identifier(fields: &RawRow) -> Option<String> {
    lookup(fields, primary::ID_CANDIDATES)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .or_else(|| {
            fields
                .get(primary::PRP_ID)
                .map(|v| v.trim())
                .filter(|id| !id.is_empty())
        })
        .map(ToString::to_string)
}

/// Headers resolved for the complementary source, once per parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogColumns {
    pub demand_id: Option<String>,
    pub date: Option<String>,
    pub hours: Option<String>,
    pub hour_kind: Option<String>,
    pub collaborator: Option<String>,
    pub role: Option<String>,
}

impl LogColumns {
    pub fn resolve(headers: &[String]) -> Self {
        let columns = Self {
            demand_id: resolve_column(headers, work_log::DEMAND_ID),
            date: resolve_column(headers, work_log::DATE),
            hours: resolve_column(headers, work_log::HOURS),
            hour_kind: resolve_column(headers, work_log::HOUR_KIND),
            collaborator: resolve_column(headers, work_log::COLLABORATOR),
            role: resolve_column(headers, work_log::ROLE),
        };
        if columns.demand_id.is_none() {
            match closest_header(headers, work_log::DEMAND_ID) {
                Some(guess) => warn!(
                    closest = %guess,
                    "work-log source has no demand id column; every row will be skipped"
                ),
                None => warn!("work-log source has no demand id column; every row will be skipped"),
            }
        }
        debug!(?columns, "resolved work-log columns");
        columns
    }

    pub fn value<'a>(row: &'a RawRow, column: &Option<String>) -> &'a str {
        column
            .as_deref()
            .and_then(|c| row.get(c))
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Diagnostic only: the header most similar to any candidate. Resolution never
/// uses this.
fn closest_header(headers: &[String], candidates: &[&str]) -> Option<String> {
    headers
        .iter()
        .filter(|h| !h.trim().is_empty())
        .map(|h| {
            let lower = h.to_lowercase();
            let score = candidates
                .iter()
                .map(|c| jaro_winkler(&lower, &c.to_lowercase()))
                .fold(0.0_f64, f64::max);
            (h, score)
        })
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(h, _)| h.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn candidate_order_beats_header_order() {
        let h = headers(&["id", "Demanda", "id_demanda"]);
        assert_eq!(resolve_column(&h, work_log::DEMAND_ID).as_deref(), Some("id_demanda"));
    }

    #[test]
    fn resolution_ignores_case_and_padding() {
        let h = headers(&["NOME COLABORADOR", " tipo da hora ", "DATA"]);
        let cols = LogColumns::resolve(&h);
        assert_eq!(cols.collaborator.as_deref(), Some("NOME COLABORADOR"));
        assert_eq!(cols.hour_kind.as_deref(), Some(" tipo da hora "));
        assert_eq!(cols.date.as_deref(), Some("DATA"));
        assert_eq!(cols.demand_id, None);
        assert_eq!(cols.role, None);
    }

    #[test]
    fn resolution_is_exact_not_fuzzy() {
        let h = headers(&["ID Demandas"]);
        assert_eq!(resolve_column(&h, work_log::DEMAND_ID), None);
        assert_eq!(closest_header(&h, work_log::DEMAND_ID).as_deref(), Some("ID Demandas"));
    }

    #[test]
    fn primary_identifier_checks_casings_then_prp() {
        let mut row = RawRow::new();
        row.insert("ID".into(), " 7 ".into());
        row.insert(primary::PRP_ID.into(), "PRP-1".into());
        assert_eq!(primary_identifier(&row).as_deref(), Some("7"));

        row.insert("ID".into(), "  ".into());
        assert_eq!(primary_identifier(&row).as_deref(), Some("PRP-1"));

        row.remove(primary::PRP_ID);
        assert_eq!(primary_identifier(&row), None);
    }

    #[test]
    fn role_slots_match_canonical_names_and_aliases() {
        assert_eq!(role_slot_for("trainee").map(|s| s.role), Some("Trainee"));
        assert_eq!(
            role_slot_for("  CYBER RESPONSIBLE ").map(|s| s.person_column),
            Some("Responsável Cyber")
        );
        assert_eq!(
            role_slot_for("responsável demanda").map(|s| s.person_column),
            Some(primary::RESPONSAVEL_DEMANDA)
        );
        assert!(role_slot_for("Estagiário").is_none());
    }
}
