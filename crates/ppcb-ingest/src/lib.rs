//! Source-side ingestion: delimited text parsing, field classification,
//! column resolution and row normalization into canonical demands.

pub mod classify;
pub mod columns;
pub mod normalize;
pub mod table;

use thiserror::Error;

pub use classify::{
    classify_category, classify_hour_kind, classify_status, display_text, format_locale_number,
    parse_hours, parse_locale_number,
};
pub use columns::{
    lookup, primary_identifier, resolve_column, role_slot_for, LogColumns, RoleSlot, ROLE_SLOTS,
};
pub use normalize::{
    normalize_all, normalize_row, try_normalize_all, try_normalize_row, NormalizeOptions,
};
pub use table::{decode, parse, parse_bytes, parse_table, Table};

pub const CRATE_NAME: &str = "ppcb-ingest";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("source text is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },
    #[error("row {row_index} has no identifier and id generation is disabled")]
    MissingIdentifier { row_index: usize },
}
