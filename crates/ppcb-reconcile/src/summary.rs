//! Dashboard rollups recomputed from a demand set.

use std::collections::BTreeMap;

use ppcb_core::{Category, Demand, Status};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourBucket {
    pub key: String,
    pub label: String,
    pub demands: usize,
    pub hours_adm: f64,
    pub hours_total: f64,
}

impl HourBucket {
    fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            demands: 0,
            hours_adm: 0.0,
            hours_total: 0.0,
        }
    }

    fn add(&mut self, demand: &Demand) {
        self.demands += 1;
        self.hours_adm += demand.hours_adm;
        self.hours_total += demand.hours_total;
    }
}

/// Work-log hours of one person summed across every demand and role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorHours {
    pub name: String,
    pub demands: usize,
    pub hours_adm: f64,
    pub hours_project: f64,
    pub hours_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub demand_count: usize,
    pub reconciled_count: usize,
    pub hours_adm: f64,
    pub hours_total: f64,
    pub by_category: Vec<HourBucket>,
    pub by_status: Vec<HourBucket>,
    pub by_collaborator: Vec<CollaboratorHours>,
}

impl DashboardSummary {
    pub fn from_demands(demands: &[Demand]) -> Self {
        let mut by_category: Vec<HourBucket> = Category::ALL
            .into_iter()
            .map(|c| HourBucket::new(c.code(), c.label()))
            .collect();
        let mut by_status: Vec<HourBucket> = Status::ALL
            .into_iter()
            .map(|s| HourBucket::new(s.code(), s.label()))
            .collect();
        let mut people: BTreeMap<&str, (CollaboratorHours, Vec<&str>)> = BTreeMap::new();

        for demand in demands {
            if let Some(bucket) = by_category.iter_mut().find(|b| b.key == demand.category.code()) {
                bucket.add(demand);
            }
            if let Some(bucket) = by_status.iter_mut().find(|b| b.key == demand.status.code()) {
                bucket.add(demand);
            }

            let collaborators = demand
                .aggregate_detail
                .iter()
                .flat_map(|agg| agg.collaborators.iter());
            for collaborator in collaborators {
                let (hours, seen) = people.entry(collaborator.name.as_str()).or_insert_with(|| {
                    (
                        CollaboratorHours {
                            name: collaborator.name.clone(),
                            demands: 0,
                            hours_adm: 0.0,
                            hours_project: 0.0,
                            hours_total: 0.0,
                        },
                        Vec::new(),
                    )
                });
                if !seen.contains(&demand.id.as_str()) {
                    seen.push(demand.id.as_str());
                    hours.demands += 1;
                }
                hours.hours_adm += collaborator.hours_adm;
                hours.hours_project += collaborator.hours_project;
                hours.hours_total += collaborator.hours_total;
            }
        }

        let mut by_collaborator: Vec<CollaboratorHours> =
            people.into_values().map(|(hours, _)| hours).collect();
        by_collaborator.sort_by(|a, b| {
            b.hours_total
                .total_cmp(&a.hours_total)
                .then_with(|| a.name.cmp(&b.name))
        });

        Self {
            demand_count: demands.len(),
            reconciled_count: demands.iter().filter(|d| d.aggregate_detail.is_some()).count(),
            hours_adm: demands.iter().map(|d| d.hours_adm).sum(),
            hours_total: demands.iter().map(|d| d.hours_total).sum(),
            by_category,
            by_status,
            by_collaborator,
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut lines = vec![
            format!("- Demandas: {}", self.demand_count),
            format!("- Conciliadas com apontamentos: {}", self.reconciled_count),
            format!("- Horas ADM: {:.1}", self.hours_adm),
            format!("- Horas totais: {:.1}", self.hours_total),
            String::new(),
            "## Por categoria".to_string(),
        ];
        lines.extend(self.by_category.iter().map(bucket_line));
        lines.push(String::new());
        lines.push("## Por status".to_string());
        lines.extend(self.by_status.iter().map(bucket_line));

        if !self.by_collaborator.is_empty() {
            lines.push(String::new());
            lines.push("## Por colaborador".to_string());
            lines.extend(self.by_collaborator.iter().map(|c| {
                format!(
                    "- {}: {:.1}h ({:.1}h ADM, {:.1}h projeto) em {} demandas",
                    c.name, c.hours_total, c.hours_adm, c.hours_project, c.demands
                )
            }));
        }
        lines.join("\n")
    }
}

fn bucket_line(bucket: &HourBucket) -> String {
    format!(
        "- {}: {} demandas, {:.1}h ADM, {:.1}h totais",
        bucket.label, bucket.demands, bucket.hours_adm, bucket.hours_total
    )
}
