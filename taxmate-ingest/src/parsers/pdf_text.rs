//! Recover table rows from the positioned glyphs of a PDF.
//!
//! Statement PDFs place each cell at its own x position; the text layer
//! carries no column separators. `pdf-extract` drives a [`GlyphCollector`]
//! that records where every glyph sits, then:
//!
//! - glyphs sharing a baseline form a line, and a line is a row
//! - a horizontal gap wider than [`PdfLayout::column_gap`] starts a new cell
//! - a vertical gap wider than [`TABLE_GAP`] starts a new table
//!
//! Once a header line has been seen its cell spans anchor the columns, so an
//! empty debit or credit cell still leaves the other values in place.

use std::any::Any;
use std::panic;

use pdf_extract::{output_doc, Document, MediaBox, OutputDev, OutputError, Transform};
use tracing::warn;

use crate::error::{IngestError, Result};
use crate::layout::PdfLayout;
use crate::parsers::pdf_table::{Cells, Page, Table};

/// Gap between glyphs, in font sizes, read as a space inside a cell
const WORD_GAP: f64 = 0.1;
/// Baseline distance, in font sizes, that separates two tables
const TABLE_GAP: f64 = 2.5;

/// One glyph on a page. `y` grows downwards; `width` is the advance in points.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub size: f64,
    pub text: String,
}

#[derive(Debug, Default)]
struct GlyphCollector {
    page_height: f64,
    current: Vec<Glyph>,
    pages: Vec<Vec<Glyph>>,
}

impl OutputDev for GlyphCollector {
    fn begin_page(
        &mut self,
        _page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> std::result::Result<(), OutputError> {
        self.page_height = media_box.ury - media_box.lly;
        self.current.clear();
        Ok(())
    }

    fn end_page(&mut self) -> std::result::Result<(), OutputError> {
        self.pages.push(std::mem::take(&mut self.current));
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        ch: &str,
    ) -> std::result::Result<(), OutputError> {
        // width is in text space (1/1000 em already divided out)
        let scale = (trm.m11 * trm.m22 - trm.m12 * trm.m21).abs().sqrt();
        let glyph = Glyph {
            x: trm.m31,
            y: self.page_height - trm.m32,
            width: width * font_size * trm.m11.hypot(trm.m12),
            size: font_size * scale,
            text: ch.to_string(),
        };
        if glyph.x.is_finite() && glyph.y.is_finite() && glyph.size > 0.0 {
            self.current.push(glyph);
        }
        Ok(())
    }

    fn begin_word(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }
}

/// Open the PDF and split every page into tables of cell rows.
pub fn read_pages(bytes: &[u8], layout: &PdfLayout) -> Result<Vec<Page>> {
    let glyphs = read_glyphs(bytes)?;
    Ok(pages_from_glyphs(glyphs, layout))
}

/// `pdf-extract` panics on some malformed content streams (undefined fonts,
/// odd graphics state); those come back as [`IngestError::Pdf`] like any
/// other undecodable file.
fn read_glyphs(bytes: &[u8]) -> Result<Vec<Vec<Glyph>>> {
    match panic::catch_unwind(|| collect_glyphs(bytes)) {
        Ok(result) => result,
        Err(payload) => {
            let reason = panic_message(&*payload);
            warn!(%reason, "pdf decoder aborted");
            Err(IngestError::Pdf(reason))
        }
    }
}

fn collect_glyphs(bytes: &[u8]) -> Result<Vec<Vec<Glyph>>> {
    let doc = Document::load_mem(bytes).map_err(|e| IngestError::Pdf(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(IngestError::Pdf("encrypted statements are not supported".to_string()));
    }
    let mut collector = GlyphCollector::default();
    output_doc(&doc, &mut collector).map_err(|e| IngestError::Pdf(e.to_string()))?;
    Ok(collector.pages)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "malformed page content".to_string())
}

/// Split positioned glyphs into tables. Column anchors carry over between pages.
pub fn pages_from_glyphs(pages: Vec<Vec<Glyph>>, layout: &PdfLayout) -> Vec<Page> {
    let mut anchors: Option<Vec<Segment>> = None;
    let mut out = Vec::with_capacity(pages.len());

    for glyphs in pages {
        let mut page = Page::default();
        let mut current = Table::default();
        let mut prev_y: Option<f64> = None;

        for line in lines(glyphs) {
            if let Some(y) = prev_y {
                if line.y - y > TABLE_GAP * line.size && !current.rows.is_empty() {
                    page.tables.push(std::mem::take(&mut current));
                }
            }
            prev_y = Some(line.y);

            let segments = segments(&line, layout.column_gap);
            let text = segments.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ");
            let cells = if layout.is_header_text(&text) {
                let cells = segments.iter().map(|s| Some(s.text.clone())).collect();
                anchors = Some(segments);
                cells
            } else {
                match &anchors {
                    Some(a) => place(segments, a),
                    None => segments.into_iter().map(|s| Some(s.text)).collect(),
                }
            };
            current.rows.push(cells);
        }

        if !current.rows.is_empty() {
            page.tables.push(current);
        }
        out.push(page);
    }

    out
}

#[derive(Debug)]
struct Line {
    y: f64,
    size: f64,
    glyphs: Vec<Glyph>,
}

/// Group glyphs by baseline, top to bottom, each line ordered left to right.
fn lines(mut glyphs: Vec<Glyph>) -> Vec<Line> {
    glyphs.retain(|g| !g.text.trim().is_empty());
    glyphs.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Line> = Vec::new();
    for g in glyphs {
        match lines.last_mut() {
            Some(line) if (g.y - line.y).abs() <= 0.5 * line.size.max(g.size) => {
                line.size = line.size.max(g.size);
                line.glyphs.push(g);
            }
            _ => lines.push(Line { y: g.y, size: g.size, glyphs: vec![g] }),
        }
    }
    for line in &mut lines {
        line.glyphs.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    lines
}

/// A cell of text and the horizontal span it covers, in points
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    start: f64,
    end: f64,
    text: String,
}

fn segments(line: &Line, column_gap: f64) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    for g in &line.glyphs {
        let end = g.x + g.width;
        match out.last_mut() {
            Some(seg) if g.x - seg.end <= column_gap * g.size => {
                if g.x - seg.end > WORD_GAP * g.size {
                    seg.text.push(' ');
                }
                seg.text.push_str(&g.text);
                seg.end = seg.end.max(end);
            }
            _ => out.push(Segment {
                start: g.x,
                end,
                text: g.text.clone(),
            }),
        }
    }
    out
}

/// Put each segment under the header column it overlaps most, or the nearest one.
fn place(segments: Vec<Segment>, anchors: &[Segment]) -> Cells {
    let mut cells: Cells = vec![None; anchors.len()];

    for seg in segments {
        let Some(col) = best_column(&seg, anchors) else {
            continue;
        };
        match &mut cells[col] {
            Some(existing) => {
                existing.push(' ');
                existing.push_str(&seg.text);
            }
            slot => *slot = Some(seg.text),
        }
    }

    cells
}

fn best_column(seg: &Segment, anchors: &[Segment]) -> Option<usize> {
    let overlap = |a: &Segment| seg.end.min(a.end) - seg.start.max(a.start);
    let centre = |s: &Segment| (s.start + s.end) / 2.0;

    let (best, best_overlap) = anchors
        .iter()
        .enumerate()
        .map(|(i, a)| (i, overlap(a)))
        .max_by(|(_, a), (_, b)| a.total_cmp(b))?;
    if best_overlap > 0.0 {
        return Some(best);
    }

    anchors
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let da = (centre(a) - centre(seg)).abs();
            let db = (centre(b) - centre(seg)).abs();
            da.total_cmp(&db)
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: f64 = 10.0;
    const ADVANCE: f64 = 5.0;

    /// Lay out `cells` on baseline `y`, each starting at its own x, fixed-pitch.
    fn line(y: f64, cells: &[(f64, &str)]) -> Vec<Glyph> {
        let mut glyphs = Vec::new();
        for &(x, text) in cells {
            for (i, ch) in text.chars().enumerate() {
                glyphs.push(Glyph {
                    x: x + i as f64 * ADVANCE,
                    y,
                    width: ADVANCE,
                    size: SIZE,
                    text: ch.to_string(),
                });
            }
        }
        glyphs
    }

    fn statement_page() -> Vec<Glyph> {
        [
            line(40.0, &[(0.0, "GUARANTY TRUST BANK PLC")]),
            line(54.0, &[(0.0, "Account Statement")]),
            line(
                100.0,
                &[
                    (0.0, "Trans Date"),
                    (70.0, "Reference"),
                    (130.0, "Value Date"),
                    (200.0, "Debit"),
                    (260.0, "Credit"),
                    (320.0, "Balance"),
                    (380.0, "Remarks"),
                ],
            ),
            line(
                114.0,
                &[
                    (0.0, "05-Jan-2024"),
                    (70.0, "TRF/001"),
                    (130.0, "05-Jan-2024"),
                    (260.0, "15,000.00"),
                    (320.0, "115,000.00"),
                    (380.0, "POS deposit"),
                ],
            ),
            line(
                128.0,
                &[
                    (0.0, "06-Jan-2024"),
                    (70.0, "POS/77"),
                    (130.0, "06-Jan-2024"),
                    (200.0, "5,000.00"),
                    (320.0, "110,000.00"),
                    (380.0, "Fuel for bike"),
                ],
            ),
        ]
        .concat()
    }

    fn text(cell: &Option<String>) -> &str {
        cell.as_deref().unwrap_or("")
    }

    #[test]
    fn test_vertical_gaps_split_tables() {
        let pages = pages_from_glyphs(vec![statement_page()], &PdfLayout::default());
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].tables.len(), 2);
        assert_eq!(pages[0].tables[0].rows.len(), 2);
        assert_eq!(pages[0].tables[1].rows.len(), 3);
    }

    #[test]
    fn test_header_anchors_keep_empty_columns() {
        let pages = pages_from_glyphs(vec![statement_page()], &PdfLayout::default());
        let rows = &pages[0].tables[1].rows;

        let header: Vec<&str> = rows[0].iter().map(text).collect();
        assert_eq!(header, ["Trans Date", "Reference", "Value Date", "Debit", "Credit", "Balance", "Remarks"]);

        let credit_row = &rows[1];
        assert_eq!(credit_row.len(), 7);
        assert_eq!(text(&credit_row[0]), "05-Jan-2024");
        assert_eq!(credit_row[3], None);
        assert_eq!(text(&credit_row[4]), "15,000.00");
        assert_eq!(text(&credit_row[6]), "POS deposit");

        let debit_row = &rows[2];
        assert_eq!(text(&debit_row[3]), "5,000.00");
        assert_eq!(debit_row[4], None);
        assert_eq!(text(&debit_row[5]), "110,000.00");
        assert_eq!(text(&debit_row[6]), "Fuel for bike");
    }

    #[test]
    fn test_glyph_order_does_not_matter() {
        let mut shuffled = statement_page();
        shuffled.reverse();
        assert_eq!(
            pages_from_glyphs(vec![shuffled], &PdfLayout::default()),
            pages_from_glyphs(vec![statement_page()], &PdfLayout::default())
        );
    }

    #[test]
    fn test_rows_before_any_header_split_on_gaps() {
        let pages = pages_from_glyphs(vec![line(10.0, &[(0.0, "a b"), (30.0, "c")])], &PdfLayout::default());
        let row: Vec<&str> = pages[0].tables[0].rows[0].iter().map(text).collect();
        assert_eq!(row, ["a b", "c"]);
    }

    #[test]
    fn test_column_gap_is_configurable() {
        let glyphs = line(10.0, &[(0.0, "left"), (30.0, "right")]);
        let wide = PdfLayout {
            column_gap: 2.0,
            ..PdfLayout::default()
        };
        let pages = pages_from_glyphs(vec![glyphs], &wide);
        let row: Vec<&str> = pages[0].tables[0].rows[0].iter().map(text).collect();
        assert_eq!(row, ["left right"]);
    }

    #[test]
    fn test_anchors_carry_across_pages() {
        let next = line(
            100.0,
            &[
                (0.0, "07-Jan-2024"),
                (70.0, "TRF/002"),
                (130.0, "07-Jan-2024"),
                (260.0, "2,000.00"),
                (320.0, "112,000.00"),
                (380.0, "Sales"),
            ],
        );
        let pages = pages_from_glyphs(vec![statement_page(), next], &PdfLayout::default());
        let row = &pages[1].tables[0].rows[0];
        assert_eq!(row.len(), 7);
        assert_eq!(text(&row[4]), "2,000.00");
        assert_eq!(row[3], None);
    }

    #[test]
    fn test_garbage_bytes_are_fatal() {
        let err = read_pages(b"definitely not a pdf", &PdfLayout::default()).unwrap_err();
        assert!(matches!(err, IngestError::Pdf(_)));
    }

    #[test]
    fn test_panic_payloads_become_messages() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bad font")), "bad font");
        assert_eq!(panic_message(&42u8), "malformed page content");
    }
}
