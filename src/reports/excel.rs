//! Spreadsheet export.

use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook};

use super::{REPORT_HEADERS, ReportError, ReportRow};

const SHEET_NAME: &str = "Relatório";
const HEADER_FILL: u32 = 0x1F4E78;

/// Render rows as an `.xlsx` workbook with a styled header row.
pub fn render(rows: &[ReportRow]) -> Result<Vec<u8>, ReportError> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_border(FormatBorder::Thin);
    let cell_format = Format::new().set_border(FormatBorder::Thin);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, title) in REPORT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header_format)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let line = index as u32 + 1;
        for (col, value) in row.cells.iter().enumerate() {
            worksheet.write_string_with_format(line, col as u16, value, &cell_format)?;
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    worksheet.autofit();

    let bytes = workbook.save_to_buffer()?;
    tracing::debug!(rows = rows.len(), bytes = bytes.len(), "Rendered spreadsheet report");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: usize) -> ReportRow {
        ReportRow {
            cells: [
                "10/01/2025 02:30".to_string(),
                format!("Cliente {n}"),
                "srv-01".to_string(),
                "Veeam".to_string(),
                "Banco ERP".to_string(),
                "Sucesso".to_string(),
                "maria".to_string(),
            ],
        }
    }

    #[test]
    fn renders_zip_container() {
        let bytes = render(&[row(1), row(2)]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn renders_header_only_when_empty() {
        let bytes = render(&[]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
