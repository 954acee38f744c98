//! File-backed reconciliation run: read the sources, reconcile, write the
//! run's reports.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ppcb_core::Demand;
use ppcb_ingest::decode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::ReconcileConfig;
use crate::period::Period;
use crate::summary::DashboardSummary;
use crate::{reconcile, ReconcileStats};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub primary_csv: String,
    pub logs_csv: Option<String>,
    pub period: Option<Period>,
}

/// Contents of `demands.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandsReport {
    pub run: RunRecord,
    pub stats: ReconcileStats,
    pub demands: Vec<Demand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stats: ReconcileStats,
    pub reports_dir: String,
    pub manifest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportManifest {
    pub schema_version: u32,
    pub run_id: Uuid,
    pub inputs: Vec<ManifestFile>,
    pub outputs: Vec<ManifestFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    pub name: String,
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

impl ManifestFile {
    fn new(name: &str, path: &Path, bytes: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            path: path.display().to_string(),
            sha256: hex::encode(Sha256::digest(bytes)),
            bytes: bytes.len() as u64,
        }
    }
}

pub struct ReconcilePipeline {
    config: ReconcileConfig,
}

impl ReconcilePipeline {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub async fn run_once(&self) -> Result<ReconcileRunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("reconcile_run", %run_id);
        self.run(run_id).instrument(span).await
    }

    async fn run(&self, run_id: Uuid) -> Result<ReconcileRunSummary> {
        let started_at = Utc::now();
        let options = self.config.options()?;

        let primary_path = &self.config.primary_csv;
        let primary_bytes = read_source(primary_path).await?;
        let logs = match &self.config.logs_csv {
            Some(path) => Some((path, read_source(path).await?)),
            None => None,
        };

        let primary_text = decode(&primary_bytes)
            .with_context(|| format!("decoding {}", primary_path.display()))?;
        let logs_text = match &logs {
            Some((path, bytes)) => {
                Some(decode(bytes).with_context(|| format!("decoding {}", path.display()))?)
            }
            None => None,
        };

        let reconciliation = reconcile(primary_text, logs_text, &options)?;
        let finished_at = Utc::now();

        let mut inputs = vec![ManifestFile::new("primary", primary_path, &primary_bytes)];
        if let Some((path, bytes)) = &logs {
            inputs.push(ManifestFile::new("work_log", path, bytes));
        }

        let report = DemandsReport {
            run: RunRecord {
                run_id,
                started_at,
                finished_at,
                primary_csv: primary_path.display().to_string(),
                logs_csv: logs.as_ref().map(|(path, _)| path.display().to_string()),
                period: options.period,
            },
            stats: reconciliation.stats.clone(),
            demands: reconciliation.demands,
        };
        let (reports_dir, manifest_path) = self.write_reports(&report, inputs).await?;

        info!(
            demands = report.stats.demands,
            reports_dir = %reports_dir.display(),
            "reconcile run written"
        );
        Ok(ReconcileRunSummary {
            run_id,
            started_at,
            finished_at,
            stats: report.stats,
            reports_dir: reports_dir.display().to_string(),
            manifest: manifest_path.display().to_string(),
        })
    }

    async fn write_reports(
        &self,
        report: &DemandsReport,
        inputs: Vec<ManifestFile>,
    ) -> Result<(PathBuf, PathBuf)> {
        let reports_dir = self.config.reports_dir.join(report.run.run_id.to_string());
        fs::create_dir_all(&reports_dir)
            .await
            .with_context(|| format!("creating {}", reports_dir.display()))?;

        let summary = DashboardSummary::from_demands(&report.demands);
        let brief = brief_markdown(report, &summary);

        let outputs = [
            (
                "demands.json",
                serde_json::to_vec_pretty(report).context("serializing demands report")?,
            ),
            (
                "summary.json",
                serde_json::to_vec_pretty(&summary).context("serializing dashboard summary")?,
            ),
            ("brief.md", brief.into_bytes()),
        ];

        let mut written = Vec::with_capacity(outputs.len());
        for (name, bytes) in &outputs {
            let path = reports_dir.join(name);
            fs::write(&path, bytes)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            written.push(ManifestFile::new(name, Path::new(name), bytes));
        }

        let manifest = ReportManifest {
            schema_version: 1,
            run_id: report.run.run_id,
            inputs,
            outputs: written,
        };
        let manifest_path = reports_dir.join("manifest.json");
        let bytes = serde_json::to_vec_pretty(&manifest).context("serializing report manifest")?;
        fs::write(&manifest_path, bytes)
            .await
            .with_context(|| format!("writing {}", manifest_path.display()))?;

        Ok((reports_dir, manifest_path))
    }
}

async fn read_source(path: &Path) -> Result<Vec<u8>> {
    fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

fn brief_markdown(report: &DemandsReport, summary: &DashboardSummary) -> String {
    let run = &report.run;
    let period = run
        .period
        .map(|p| format!("{} a {}", p.start, p.end))
        .unwrap_or_else(|| "completo".to_string());
    format!(
        "# PPC Board - Conciliação\n\n\
         - Run ID: `{}`\n\
         - Início: {}\n\
         - Fim: {}\n\
         - Demandas: `{}`\n\
         - Apontamentos: `{}`\n\
         - Período: {}\n\
         - Linhas de apontamento ignoradas: {}\n\
         - Agregados sem demanda: {}\n\n\
         {}\n",
        run.run_id,
        run.started_at,
        run.finished_at,
        run.primary_csv,
        run.logs_csv.as_deref().unwrap_or("-"),
        period,
        report.stats.skipped_log_rows,
        report.stats.orphan_aggregates,
        summary.to_markdown()
    )
}

pub async fn run_once_from_env() -> Result<ReconcileRunSummary> {
    ReconcilePipeline::new(ReconcileConfig::from_env()).run_once().await
}

pub fn load_demands_report(path: &Path) -> Result<DemandsReport> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
