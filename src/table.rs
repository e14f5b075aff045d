//! Table construction.
//!
//! A table is built cell by cell; the engine issues the table handle with
//! the first cell and may reissue it on later ones, so the shared handle
//! reference is updated in place. Row and column positions are 1-based
//! and advance automatically: `add_column` moves right, `add_row` wraps
//! to the first column of the next row.

use crate::adapter::Adapter;
use crate::asset::Font;
use crate::error::{Error, Result};
use crate::handle::{HandleKind, HandleRef, Handleable};
use crate::options::OptionList;

/// An incrementally built table, placed by the builder one rectangle at a
/// time until the engine reports all rows are consumed.
#[derive(Debug)]
pub struct Table {
    adapter: Adapter,
    handle: HandleRef,
    row: u32,
    column: u32,
    cell_options: OptionList,
    text_options: OptionList,
}

impl Table {
    pub(crate) fn new(adapter: &Adapter) -> Self {
        Self {
            adapter: adapter.clone(),
            handle: HandleRef::unissued(HandleKind::Table),
            row: 1,
            column: 1,
            cell_options: OptionList::new(),
            text_options: OptionList::new(),
        }
    }

    /// Fill the current row through `build`, then move to the next row.
    pub fn add_row(&mut self, build: impl FnOnce(&mut Table) -> Result<()>) -> Result<()> {
        build(self)?;
        self.row += 1;
        self.column = 1;
        Ok(())
    }

    /// Add a cell in the next column of the current row.
    ///
    /// Call-site options win over the table's default cell options.
    pub fn add_column(&mut self, text: &str, options: OptionList) -> Result<()> {
        let merged = options.merge_over(&self.cell_options);
        self.adapter
            .add_table_cell(&self.handle, self.column, self.row, text, merged)?;
        self.column += 1;
        Ok(())
    }

    /// Add a single-line text cell set with the table's default text
    /// options under `fittextline`.
    pub fn add_textline_column(
        &mut self,
        text: &str,
        text_options: OptionList,
        options: OptionList,
    ) -> Result<()> {
        let fit = text_options.merge_over(&self.text_options);
        self.add_column(text, options.with("fittextline", fit))
    }

    /// Set the default font and size for textline cells.
    pub fn set_font(&mut self, font: &Font, size: f64) {
        self.text_options.set("font", font.handle_ref());
        self.text_options.set("fontsize", size);
    }

    /// Set the default row height.
    pub fn set_row_height(&mut self, height: f64) {
        self.cell_options.set("rowheight", height);
    }

    /// Set the same default margin on all four cell sides.
    pub fn set_cell_margin(&mut self, margin: f64) {
        self.set_cell_margins(margin, margin, margin, margin);
    }

    /// Set the default cell margins side by side.
    pub fn set_cell_margins(&mut self, top: f64, right: f64, bottom: f64, left: f64) {
        self.cell_options.set("margintop", top);
        self.cell_options.set("marginright", right);
        self.cell_options.set("marginbottom", bottom);
        self.cell_options.set("marginleft", left);
    }

    /// Query a table metric such as `rowcount` or `horshrinking`.
    pub fn info(&self, key: &str) -> Result<f64> {
        if !self.handle.is_issued() {
            return Err(Error::Unissued("table"));
        }
        self.adapter.info_table(self, key)
    }
}

impl Handleable for Table {
    fn handle_ref(&self) -> &HandleRef {
        &self.handle
    }
}
