//! Multi-line text flows.
//!
//! A textflow collects text spans with inline formatting and is placed
//! into rectangles one chunk at a time; the engine reports after each
//! placement whether content is still pending. Appending spans may make
//! the engine reissue the handle, which the shared reference absorbs.

use crate::adapter::Adapter;
use crate::asset::Font;
use crate::error::Result;
use crate::handle::{HandleRef, Handleable};
use crate::options::OptionList;

/// Formatted text prepared for rectangle-by-rectangle placement.
#[derive(Debug)]
pub struct Textflow {
    adapter: Adapter,
    handle: HandleRef,
}

impl Textflow {
    /// Create a flow from an initial span set in `font` at `size`.
    ///
    /// The font and size override any `font`/`fontsize` entries in the
    /// supplied options.
    pub(crate) fn create(
        adapter: &Adapter,
        font: &Font,
        size: f64,
        text: &str,
        options: OptionList,
    ) -> Result<Self> {
        let options = options
            .with("font", font.handle_ref())
            .with("fontsize", size);
        let handle = adapter.create_textflow(text, options)?;
        Ok(Self {
            adapter: adapter.clone(),
            handle,
        })
    }

    /// Append another span, optionally with new formatting options.
    pub fn append(&self, text: &str, options: OptionList) -> Result<&Self> {
        self.adapter.add_textflow(&self.handle, text, options)?;
        Ok(self)
    }

    /// Query a flow metric such as `textwidth` or `firstlinedist`.
    pub fn info(&self, key: &str) -> Result<f64> {
        self.adapter.info_textflow(self, key)
    }
}

impl Handleable for Textflow {
    fn handle_ref(&self) -> &HandleRef {
        &self.handle
    }
}
