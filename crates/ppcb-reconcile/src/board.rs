//! Board-shaped views over canonical demands: filtering, status columns,
//! category counters and the people list.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use ppcb_core::{Category, Demand, Status};
use ppcb_ingest::columns::primary;
use ppcb_ingest::ROLE_SLOTS;
use serde::{Deserialize, Serialize};

/// Raw columns searched by the free-text query, besides the display fields.
const QUERY_COLUMNS: &[&str] = &[
    primary::DETALHE_ESCOPO,
    primary::SISTEMA_ESCOPO,
    primary::NOME_CLIENTE,
    primary::PRP_ID,
    primary::PLANNER_ID,
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandFilter {
    /// Case-insensitive substring of anyone assigned to a role slot.
    #[serde(default)]
    pub person: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub query: Option<String>,
}

impl DemandFilter {
    pub fn matches(&self, demand: &Demand) -> bool {
        self.category.map_or(true, |c| demand.category == c)
            && self.matches_person(demand)
            && self.matches_query(demand)
    }

    fn matches_person(&self, demand: &Demand) -> bool {
        let Some(needle) = non_blank(&self.person) else {
            return true;
        };
        ROLE_SLOTS
            .iter()
            .any(|slot| demand.raw(slot.person_column).to_lowercase().contains(&needle))
    }

    fn matches_query(&self, demand: &Demand) -> bool {
        let Some(needle) = non_blank(&self.query) else {
            return true;
        };
        let mut blob = vec![
            demand.title.as_str(),
            demand.subtitle.as_str(),
            demand.responsible.as_str(),
        ];
        blob.extend(QUERY_COLUMNS.iter().map(|column| demand.raw(column)));
        blob.join(" ").to_lowercase().contains(&needle)
    }

    fn without_category(&self) -> Self {
        Self {
            category: None,
            ..self.clone()
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardCard {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub responsible: String,
    pub initials: String,
    pub category: Category,
    pub hours_adm: f64,
    pub hours_total: f64,
}

impl From<&Demand> for BoardCard {
    fn from(demand: &Demand) -> Self {
        Self {
            id: demand.id.clone(),
            title: demand.title.clone(),
            subtitle: demand.subtitle.clone(),
            responsible: demand.responsible.clone(),
            initials: demand.responsible_initials(),
            category: demand.category,
            hours_adm: demand.hours_adm,
            hours_total: demand.hours_total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardColumn {
    pub status: Status,
    pub hours_adm: f64,
    pub cards: Vec<BoardCard>,
}

/// One column per status in board order, empty columns included. Cards are
/// ordered by ADM hours, highest first, then by title.
pub fn board_columns(demands: &[Demand], filter: &DemandFilter) -> Vec<BoardColumn> {
    Status::ALL
        .into_iter()
        .map(|status| {
            let mut cards: Vec<BoardCard> = demands
                .iter()
                .filter(|d| d.status == status && filter.matches(d))
                .map(BoardCard::from)
                .collect();
            cards.sort_by(|a, b| {
                b.hours_adm
                    .total_cmp(&a.hours_adm)
                    .then_with(|| compare_titles(&a.title, &b.title))
            });
            BoardColumn {
                status,
                hours_adm: cards.iter().map(|c| c.hours_adm).sum(),
                cards,
            }
        })
        .collect()
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
}

/// Demands per category under every filter constraint except the category
/// one, so the counters keep showing what picking another category yields.
pub fn category_counts(demands: &[Demand], filter: &DemandFilter) -> Vec<CategoryCount> {
    let base = filter.without_category();
    Category::ALL
        .into_iter()
        .map(|category| CategoryCount {
            category,
            count: demands
                .iter()
                .filter(|d| d.category == category && base.matches(d))
                .count(),
        })
        .collect()
}

/// Everyone named in a role slot across all demands, sorted and distinct.
pub fn people(demands: &[Demand]) -> Vec<String> {
    let names: BTreeSet<String> = demands
        .iter()
        .flat_map(|d| ROLE_SLOTS.iter().map(move |slot| d.raw(slot.person_column)))
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect();
    names.into_iter().collect()
}
