use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ppcb_ingest::NormalizeOptions;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::aggregate::{AggregateOptions, DateOrdering};
use crate::period::Period;
use crate::{ReconcileError, ReconcileOptions};

/// Where the sources live, where reports go, and how the engine is tuned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub primary_csv: PathBuf,
    pub logs_csv: Option<PathBuf>,
    pub reports_dir: PathBuf,
    pub date_ordering: DateOrdering,
    pub generate_missing_ids: bool,
    /// Restrict work-log hours to one month, `YYYY-MM`.
    pub month: Option<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            primary_csv: PathBuf::from("./data/demandas.csv"),
            logs_csv: None,
            reports_dir: PathBuf::from("./reports"),
            date_ordering: DateOrdering::Lexical,
            generate_missing_ids: true,
            month: None,
        }
    }
}

impl ReconcileConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            primary_csv: lookup("PPCB_PRIMARY_CSV")
                .map(PathBuf::from)
                .unwrap_or(defaults.primary_csv),
            logs_csv: lookup("PPCB_LOGS_CSV")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            reports_dir: lookup("PPCB_REPORTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.reports_dir),
            date_ordering: lookup("PPCB_DATE_ORDERING")
                .map(|v| parse_date_ordering(&v))
                .unwrap_or_default(),
            generate_missing_ids: lookup("PPCB_GENERATE_IDS")
                .map(|v| !matches!(v.trim(), "0" | "false" | "FALSE" | "False" | "no"))
                .unwrap_or(true),
            month: lookup("PPCB_MONTH").filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn period(&self) -> Result<Option<Period>, ReconcileError> {
        self.month.as_deref().map(Period::parse_month).transpose()
    }

    pub fn options(&self) -> Result<ReconcileOptions, ReconcileError> {
        Ok(ReconcileOptions {
            aggregate: AggregateOptions {
                date_ordering: self.date_ordering,
            },
            normalize: NormalizeOptions {
                generate_missing_ids: self.generate_missing_ids,
            },
            period: self.period()?,
        })
    }
}

fn parse_date_ordering(value: &str) -> DateOrdering {
    match value.trim().to_ascii_lowercase().as_str() {
        "calendar" => DateOrdering::Calendar,
        "lexical" | "" => DateOrdering::Lexical,
        other => {
            warn!(value = other, "unknown PPCB_DATE_ORDERING; using lexical");
            DateOrdering::Lexical
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_defaults() {
        let config = ReconcileConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, ReconcileConfig::default());
        let options = config.options().unwrap();
        assert_eq!(options.aggregate.date_ordering, DateOrdering::Lexical);
        assert!(options.normalize.generate_missing_ids);
        assert!(options.period.is_none());
    }

    #[test]
    fn env_overrides() {
        let config = ReconcileConfig::from_lookup(lookup_from(&[
            ("PPCB_PRIMARY_CSV", "/tmp/a.csv"),
            ("PPCB_LOGS_CSV", "/tmp/b.csv"),
            ("PPCB_DATE_ORDERING", "Calendar"),
            ("PPCB_GENERATE_IDS", "false"),
            ("PPCB_MONTH", "2026-02"),
        ]));
        assert_eq!(config.logs_csv.as_deref(), Some(Path::new("/tmp/b.csv")));
        let options = config.options().unwrap();
        assert_eq!(options.aggregate.date_ordering, DateOrdering::Calendar);
        assert!(!options.normalize.generate_missing_ids);
        assert_eq!(options.period.unwrap().end.to_string(), "2026-02-28");
    }

    #[test]
    fn bad_values_degrade_or_fail_at_options() {
        let config = ReconcileConfig::from_lookup(lookup_from(&[
            ("PPCB_DATE_ORDERING", "chronological"),
            ("PPCB_LOGS_CSV", " "),
            ("PPCB_MONTH", "fevereiro"),
        ]));
        assert_eq!(config.date_ordering, DateOrdering::Lexical);
        assert_eq!(config.logs_csv, None);
        assert!(matches!(config.options(), Err(ReconcileError::InvalidPeriod(_))));
    }

    #[test]
    fn yaml_file_fills_missing_keys_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "logs_csv: fixtures/apontamentos.csv\ndate_ordering: calendar").unwrap();
        let config = ReconcileConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.date_ordering, DateOrdering::Calendar);
        assert_eq!(config.primary_csv, PathBuf::from("./data/demandas.csv"));
        assert!(config.logs_csv.is_some());
    }
}
