//! Report exports.
//!
//! Both exporters consume the same [`ReportRow`] projection of a
//! [`ValidationRecord`], so the spreadsheet and the PDF always carry the same
//! rows, columns and formatting of values.

pub mod excel;
pub mod pdf;

use chrono::{DateTime, FixedOffset, NaiveDate};
use sea_orm::DatabaseConnection;
use thiserror::Error;

use crate::error::RepositoryError;
use crate::filters::{SortKey, ValidationFilter};
use crate::repositories::{ValidationRecord, ValidationRepository};

/// Column titles shared by every export, in order.
pub const REPORT_HEADERS: [&str; 7] = [
    "Data/Hora",
    "Cliente",
    "Servidor",
    "Ferramenta",
    "Rotina",
    "Status",
    "Validador",
];

/// Timestamp format used in report cells.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Placeholder for values that are not available.
pub const MISSING: &str = "-";

pub const EXCEL_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to load report data: {0}")]
    Data(#[from] RepositoryError),
    #[error("failed to render spreadsheet: {0}")]
    Excel(#[from] rust_xlsxwriter::XlsxError),
    #[error("failed to render PDF: {0}")]
    Pdf(String),
}

/// One report line: the seven cells under [`REPORT_HEADERS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub cells: [String; 7],
}

fn or_missing(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| MISSING.to_string())
}

impl ReportRow {
    pub fn from_record(record: &ValidationRecord, offset: &FixedOffset) -> Self {
        let timestamp = record
            .validation
            .created_at
            .with_timezone(offset)
            .format(TIMESTAMP_FORMAT)
            .to_string();

        Self {
            cells: [
                timestamp,
                or_missing(record.client_name()),
                or_missing(record.server_hostname()),
                or_missing(Some(record.tool_name.as_str())),
                or_missing(Some(record.routine.description.as_str())),
                record.validation.status.label().to_string(),
                or_missing(record.validator_name()),
            ],
        }
    }
}

/// Header information printed above the PDF table.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub title: String,
    /// Generation time already formatted in the display offset
    pub generated_at: String,
    /// Applied filters, one "Label: value" entry each
    pub filters: Vec<String>,
}

impl ReportMeta {
    pub fn new(generated_at: DateTime<FixedOffset>, filters: Vec<String>) -> Self {
        Self {
            title: "Relatório de Validações de Backup".to_string(),
            generated_at: generated_at.format(TIMESTAMP_FORMAT).to_string(),
            filters,
        }
    }
}

/// Human-readable description of the applied filters.
pub fn describe_filter(filter: &ValidationFilter, client_name: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();

    if filter.client_id.is_some() {
        lines.push(format!("Cliente: {}", client_name.unwrap_or(MISSING)));
    }
    if let Some(status) = filter.status {
        lines.push(format!("Status: {}", status.label()));
    }
    let fmt = |d: NaiveDate| d.format("%d/%m/%Y").to_string();
    match (filter.start_date, filter.end_date) {
        (Some(start), Some(end)) => lines.push(format!("Período: {} a {}", fmt(start), fmt(end))),
        (Some(start), None) => lines.push(format!("A partir de: {}", fmt(start))),
        (None, Some(end)) => lines.push(format!("Até: {}", fmt(end))),
        (None, None) => {}
    }
    if filter.sort != SortKey::Recent {
        lines.push(format!("Ordenação: {}", filter.sort.label()));
    }

    lines
}

/// Download filename for an export generated on `date`.
pub fn export_filename(date: NaiveDate, extension: &str) -> String {
    format!("relatorio_backups_{}.{}", date.format("%Y-%m-%d"), extension)
}

/// Load every row selected by `filter`, in the filter's order.
pub async fn collect_rows(
    db: &DatabaseConnection,
    filter: &ValidationFilter,
    offset: &FixedOffset,
) -> Result<Vec<ReportRow>, ReportError> {
    let validations = filter
        .query(offset)
        .all(db)
        .await
        .map_err(RepositoryError::database_error)?;
    let records = ValidationRepository::new(db).resolve(validations).await?;

    Ok(records
        .iter()
        .map(|record| ReportRow::from_record(record, offset))
        .collect())
}
