//! Row filter for tabular PDF statements.
//!
//! Works on a plain `pages -> tables -> rows -> cells` structure so any
//! table source can feed it. Per row, in order: blank rows, header rows
//! (both markers present), short rows and rows without a date are skipped;
//! everything else goes through the normalizer.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::Extraction;
use crate::layout::PdfLayout;
use crate::raw::RawRow;

pub type Cells = Vec<Option<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Cells>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub tables: Vec<Table>,
}

pub fn extract_tables(pages: &[Page], layout: &PdfLayout) -> Extraction {
    let mut out = Extraction::default();

    for (page_no, page) in pages.iter().enumerate() {
        for table in &page.tables {
            for row in &table.rows {
                out.stats.rows_seen += 1;

                if row.iter().all(|c| c.as_deref().is_none_or(|s| s.trim().is_empty())) {
                    out.stats.incomplete_rows += 1;
                    continue;
                }
                if layout.is_header(row) {
                    out.stats.header_rows += 1;
                    continue;
                }
                let Some(cells) = layout.map_cells(row) else {
                    debug!(page = page_no + 1, cells = row.len(), "short table row skipped");
                    out.stats.short_rows += 1;
                    continue;
                };
                if cells.date.is_none() {
                    out.stats.incomplete_rows += 1;
                    continue;
                }

                out.push(RawRow::Pdf(cells));
            }
        }
    }

    out
}
