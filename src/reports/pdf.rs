//! Printable PDF export (landscape A4).

use std::ops::Range;

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

use super::{REPORT_HEADERS, ReportError, ReportMeta, ReportRow};

const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 12.0;
const ROW_HEIGHT: f32 = 6.0;
const TITLE_SIZE: f32 = 15.0;
const META_SIZE: f32 = 9.0;
const TABLE_SIZE: f32 = 8.0;
const LAYER: &str = "Layer 1";

/// Column widths in millimetres, matching [`REPORT_HEADERS`].
const COLUMN_WIDTHS: [f32; 7] = [30.0, 45.0, 38.0, 32.0, 70.0, 22.0, 36.0];

/// Approximate Helvetica glyph width at [`TABLE_SIZE`], in millimetres.
const GLYPH_WIDTH: f32 = 1.6;

/// Vertical space consumed by the title block on the first page.
fn first_page_header_height(meta: &ReportMeta) -> f32 {
    // title, generated-at, count, one line per filter, gap
    8.0 + 5.0 + 5.0 + meta.filters.len() as f32 * 5.0 + 4.0
}

fn table_rows_fitting(top: f32) -> usize {
    // the table header takes one row
    let usable = top - MARGIN - ROW_HEIGHT - ROW_HEIGHT;
    ((usable / ROW_HEIGHT).floor() as usize).max(1)
}

/// Split `total` rows into per-page ranges.
pub fn paginate(total: usize, meta: &ReportMeta) -> Vec<Range<usize>> {
    let first_capacity = table_rows_fitting(PAGE_HEIGHT - MARGIN - first_page_header_height(meta));
    let other_capacity = table_rows_fitting(PAGE_HEIGHT - MARGIN);

    let mut pages = Vec::new();
    let mut start = 0;
    let mut capacity = first_capacity;
    loop {
        let end = (start + capacity).min(total);
        pages.push(start..end);
        if end >= total {
            break;
        }
        start = end;
        capacity = other_capacity;
    }
    pages
}

/// Shorten `text` so it fits a column `width` millimetres wide.
fn fit(text: &str, width: f32) -> String {
    let max_chars = ((width - 2.0) / GLYPH_WIDTH).floor().max(3.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{kept}...")
}

/// Cell texts as printed, each fitted to its column.
fn fitted_cells(cells: &[&str]) -> Vec<String> {
    cells
        .iter()
        .zip(COLUMN_WIDTHS)
        .map(|(cell, width)| fit(cell, width))
        .collect()
}

fn write_row(layer: &PdfLayerReference, cells: &[&str], y: f32, font: &IndirectFontRef) {
    let mut x = MARGIN;
    for (text, width) in fitted_cells(cells).into_iter().zip(COLUMN_WIDTHS) {
        layer.use_text(text, TABLE_SIZE, Mm(x), Mm(y), font);
        x += width;
    }
}

/// Render rows as a paginated PDF with a repeated table header and page numbers.
pub fn render(rows: &[ReportRow], meta: &ReportMeta) -> Result<Vec<u8>, ReportError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(meta.title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Pdf(format!("{e:?}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Pdf(format!("{e:?}")))?;

    let pages = paginate(rows.len(), meta);
    let page_count = pages.len();

    for (index, range) in pages.into_iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
            doc.get_page(page).get_layer(layer)
        };

        let mut y = PAGE_HEIGHT - MARGIN;

        if index == 0 {
            y -= 6.0;
            layer.use_text(meta.title.as_str(), TITLE_SIZE, Mm(MARGIN), Mm(y), &bold);
            y -= 7.0;
            layer.use_text(
                format!("Gerado em: {}", meta.generated_at),
                META_SIZE,
                Mm(MARGIN),
                Mm(y),
                &regular,
            );
            y -= 5.0;
            layer.use_text(
                format!("Total de registros: {}", rows.len()),
                META_SIZE,
                Mm(MARGIN),
                Mm(y),
                &regular,
            );
            for filter in &meta.filters {
                y -= 5.0;
                layer.use_text(filter.as_str(), META_SIZE, Mm(MARGIN), Mm(y), &regular);
            }
            y -= 4.0;
        }

        y -= ROW_HEIGHT;
        write_row(&layer, &REPORT_HEADERS, y, &bold);

        for row in &rows[range] {
            y -= ROW_HEIGHT;
            let cells: Vec<&str> = row.cells.iter().map(String::as_str).collect();
            write_row(&layer, &cells, y, &regular);
        }

        if index == 0 && rows.is_empty() {
            y -= ROW_HEIGHT;
            layer.use_text(
                "Nenhum registro encontrado.",
                TABLE_SIZE,
                Mm(MARGIN),
                Mm(y),
                &regular,
            );
        }

        layer.use_text(
            format!("Página {} de {}", index + 1, page_count),
            TABLE_SIZE,
            Mm(PAGE_WIDTH - MARGIN - 25.0),
            Mm(MARGIN - 5.0),
            &regular,
        );
    }

    let bytes = doc
        .save_to_bytes()
        .map_err(|e| ReportError::Pdf(format!("{e:?}")))?;

    tracing::debug!(rows = rows.len(), pages = page_count, bytes = bytes.len(), "Rendered PDF report");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(filters: usize) -> ReportMeta {
        ReportMeta {
            title: "Relatório".to_string(),
            generated_at: "10/01/2025 08:00".to_string(),
            filters: (0..filters).map(|i| format!("Filtro {i}")).collect(),
        }
    }

    fn row() -> ReportRow {
        ReportRow {
            cells: [
                "10/01/2025 02:30".to_string(),
                "Acme".to_string(),
                "srv-01".to_string(),
                "Veeam".to_string(),
                "Banco ERP".to_string(),
                "Sucesso".to_string(),
                "maria".to_string(),
            ],
        }
    }

    #[test]
    fn pagination_covers_every_row_once() {
        let meta = meta(2);
        let pages = paginate(250, &meta);

        assert!(pages.len() > 1);
        assert_eq!(pages.first().map(|r| r.start), Some(0));
        assert_eq!(pages.last().map(|r| r.end), Some(250));
        for pair in pages.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        // Later pages have no title block, so they hold more rows.
        assert!(pages[1].len() > pages[0].len());
    }

    #[test]
    fn empty_report_has_one_page() {
        assert_eq!(paginate(0, &meta(0)), vec![0..0]);
    }

    #[test]
    fn long_values_are_truncated() {
        let fitted = fit(&"x".repeat(200), 30.0);
        assert!(fitted.ends_with("..."));
        assert!(fitted.chars().count() <= 17);
        assert_eq!(fit("short", 30.0), "short");
    }

    #[test]
    fn typical_rows_print_every_value_unchanged() {
        let row = row();
        let cells: Vec<&str> = row.cells.iter().map(String::as_str).collect();
        assert_eq!(fitted_cells(&cells), row.cells.to_vec());

        let headers = fitted_cells(&REPORT_HEADERS);
        assert_eq!(headers, REPORT_HEADERS.map(str::to_string).to_vec());
    }

    #[test]
    fn renders_pdf_document() {
        let rows: Vec<ReportRow> = (0..80).map(|_| row()).collect();
        let bytes = render(&rows, &meta(1)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
