//! Document assembly over a running engine.
//!
//! [`PdfBuilder`] owns the document lifecycle: it opens the document when
//! constructed, tracks which page is current and which pages are
//! suspended, and closes everything in order on [`save`](PdfBuilder::save)
//! or [`render`](PdfBuilder::render). Content goes onto pages through the
//! typed wrappers it hands out ([`Font`], [`Image`], [`Table`],
//! [`Textflow`], imported documents) so raw handles never surface.
//!
//! # Example
//!
//! ```
//! use enpdf::builder::PdfBuilder;
//! use enpdf::color::Color;
//! use enpdf::options::OptionList;
//! use enpdf::testing::FakeEngine;
//!
//! fn main() -> enpdf::Result<()> {
//!     let mut pdf = PdfBuilder::new(FakeEngine::new())?;
//!     let font = pdf.load_font("Helvetica", None, OptionList::new())?;
//!
//!     pdf.add_page(595.0, 842.0, OptionList::new())?;
//!     pdf.draw(|pen| {
//!         pen.fill(&Color::gray(0.9))?
//!             .rectangle(40.0, 700.0, 515.0, 100.0)?
//!             .paint_fill()?;
//!         Ok(())
//!     })?;
//!
//!     let flow = pdf.new_textflow(&font, 12.0, "Hello", OptionList::new())?;
//!     pdf.place_textflow(&flow, 40.0, 40.0, 515.0, 600.0, OptionList::new())?;
//!
//!     let bytes = pdf.render()?;
//!     assert!(bytes.starts_with(b"%PDF"));
//!     assert_eq!(pdf.mime_type(), "application/pdf");
//!     Ok(())
//! }
//! ```

use std::collections::BTreeSet;

use crate::adapter::Adapter;
use crate::asset::{Font, Graphics, Image};
use crate::color::{Color, SpotColor};
use crate::draw::{Drawing, GraphicsState, Layer, LayerDependency, Shading, ShadingKind};
use crate::engine::{Engine, Scope};
use crate::error::{Error, Result};
use crate::handle::Handleable;
use crate::options::{OptionList, OptionValue};
use crate::page::PageSet;
use crate::pdi::{PdiDocument, PdiPage};
use crate::table::Table;
use crate::textflow::Textflow;

/// Fit results the engine reports when a box could not take all content.
const FIT_STOP: &str = "_stop";

/// High-level document builder.
///
/// Pages are numbered from 1 in creation order. Starting a new page or
/// resuming an old one suspends whatever page is open, so any page can
/// be revisited until the document is saved.
#[derive(Debug)]
pub struct PdfBuilder {
    adapter: Adapter,
    pages: PageSet,
    page_options: OptionList,
    ignored: BTreeSet<u32>,
}

impl PdfBuilder {
    /// The Internet media type of the rendered output.
    pub const MEDIA_TYPE: &'static str = "application/pdf";

    /// Start an in-memory document on a fresh engine.
    pub fn new(engine: impl Engine + 'static) -> Result<Self> {
        Self::new_document(engine, OptionList::new())
    }

    /// Start an in-memory document with document options.
    ///
    /// The finished bytes come back from [`render`](Self::render).
    pub fn new_document(engine: impl Engine + 'static, options: OptionList) -> Result<Self> {
        let adapter = Adapter::new(engine)?;
        adapter.begin_document(None, options)?;
        Ok(Self::over(adapter))
    }

    /// Start a document the engine writes to `filename` on save.
    pub fn create_file(
        engine: impl Engine + 'static,
        filename: &str,
        options: OptionList,
    ) -> Result<Self> {
        let adapter = Adapter::new(engine)?;
        adapter.begin_document(Some(filename), options)?;
        Ok(Self::over(adapter))
    }

    fn over(adapter: Adapter) -> Self {
        Self {
            adapter,
            pages: PageSet::new(),
            page_options: OptionList::new(),
            ignored: BTreeSet::new(),
        }
    }

    /// The adapter this builder drives, for calls the builder does not
    /// wrap.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    // ------------------------------------------------------------------
    // Page lifecycle
    // ------------------------------------------------------------------

    /// Default options applied to every new page, under any options the
    /// `add_page` call itself supplies.
    pub fn set_page_options(&mut self, options: OptionList) {
        self.page_options = options;
    }

    /// Start a new page of `width` by `height` points and make it
    /// current, suspending the page that was open.
    ///
    /// Returns the new page's number.
    pub fn add_page(&mut self, width: f64, height: f64, options: OptionList) -> Result<u32> {
        self.suspend_current()?;
        self.adapter
            .begin_page(width, height, options.merge_over(&self.page_options))?;
        Ok(self.pages.begin())
    }

    /// Bring a suspended page back as the current page.
    ///
    /// The page that was open is suspended first. Resuming a page that
    /// is not suspended, including the current one, is an error.
    pub fn resume_page(&mut self, number: u32, options: OptionList) -> Result<()> {
        if self.pages.current() == Some(number) || !self.pages.is_suspended(number) {
            return Err(Error::PageNotSuspended(number));
        }
        self.suspend_current()?;
        self.adapter
            .resume_page(options.with("pagenumber", number))?;
        self.pages.resume(number)
    }

    /// Resume the highest-numbered suspended page.
    ///
    /// The page that is currently open does not count; with nothing
    /// suspended this is an error.
    pub fn resume_last(&mut self, options: OptionList) -> Result<()> {
        let last = self
            .pages
            .last_suspended()
            .ok_or(Error::NoSuspendedPages)?;
        self.resume_page(last, options)
    }

    /// Exclude a page from [`for_each_suspended`](Self::for_each_suspended)
    /// passes. The page is still closed normally by [`save`](Self::save).
    pub fn ignore_page(&mut self, number: u32) {
        self.ignored.insert(number);
    }

    /// Visit every suspended page in ascending order, resuming each one
    /// before the closure runs. Ignored pages are skipped.
    ///
    /// The page the closure leaves open is suspended again before the
    /// next visit; after the last visit that page stays current, so a
    /// full pass can be repeated.
    pub fn for_each_suspended(
        &mut self,
        mut visit: impl FnMut(&mut PdfBuilder, u32) -> Result<()>,
    ) -> Result<()> {
        self.suspend_current()?;
        for number in self.pages.suspended() {
            if self.ignored.contains(&number) {
                continue;
            }
            self.resume_page(number, OptionList::new())?;
            visit(self, number)?;
        }
        Ok(())
    }

    /// Number of pages started so far, suspended or not.
    pub fn page_count(&self) -> u32 {
        self.pages.total()
    }

    /// The page currently open for output, if any.
    pub fn current_page(&self) -> Option<u32> {
        self.pages.current()
    }

    /// Suspended page numbers in ascending order.
    pub fn suspended_pages(&self) -> Vec<u32> {
        self.pages.suspended()
    }

    /// Close every page and the document itself.
    ///
    /// Suspended pages are resumed and ended in ascending order, then
    /// the document is ended. A file-backed document is complete on
    /// disk after this; an in-memory document holds its bytes for
    /// [`render`](Self::render).
    pub fn save(&mut self) -> Result<()> {
        self.suspend_current()?;
        for number in self.pages.suspended() {
            self.adapter
                .resume_page(OptionList::new().with("pagenumber", number))?;
            self.pages.resume(number)?;
            self.adapter.end_page(OptionList::new())?;
            self.pages.finish();
        }
        self.adapter.end_document(OptionList::new())?;
        Ok(())
    }

    /// Save the document and return its bytes.
    pub fn render(&mut self) -> Result<Vec<u8>> {
        self.save()?;
        self.adapter.get_buffer()
    }

    /// Media type of the bytes [`render`](Self::render) produces.
    pub fn mime_type(&self) -> &'static str {
        Self::MEDIA_TYPE
    }

    /// Suspend the current page if one is open.
    fn suspend_current(&mut self) -> Result<()> {
        if self.adapter.is_scope(Scope::Page)? {
            self.adapter.suspend_page(OptionList::new())?;
            self.pages.park();
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Resources
    // ------------------------------------------------------------------

    /// Load a font by name. `encoding` defaults to `unicode`.
    pub fn load_font(
        &self,
        name: &str,
        encoding: Option<&str>,
        options: OptionList,
    ) -> Result<Font> {
        Font::load(&self.adapter, name, encoding, options)
    }

    /// Load an image from raw bytes. `imagetype` defaults to `auto`.
    pub fn load_image(
        &self,
        contents: &[u8],
        imagetype: Option<&str>,
        options: OptionList,
    ) -> Result<Image> {
        Image::load(&self.adapter, contents, imagetype, options)
    }

    /// Load a vector graphic from raw bytes. `graphicstype` defaults to
    /// `auto`.
    pub fn load_graphics(
        &self,
        contents: &[u8],
        graphicstype: Option<&str>,
        options: OptionList,
    ) -> Result<Graphics> {
        Graphics::load(&self.adapter, contents, graphicstype, options)
    }

    /// Register a named spot color for later tinting.
    pub fn load_spot_color(&self, name: &str) -> Result<SpotColor> {
        let handle = self.adapter.make_spot_color(name)?;
        Ok(SpotColor::new(name, handle))
    }

    /// Open a PDF from raw bytes for page import and inspection.
    pub fn import(&self, contents: &[u8], options: OptionList) -> Result<PdiDocument> {
        PdiDocument::open(&self.adapter, contents, options)
    }

    // ------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------

    /// Place an imported page with its lower-left corner at `(x, y)`.
    pub fn place_page(&self, page: &PdiPage, x: f64, y: f64, options: OptionList) -> Result<()> {
        if !page.handle_ref().is_issued() {
            return Err(Error::Unissued("imported page"));
        }
        self.adapter.fit_pdi_page(page, x, y, options)
    }

    /// Place an image fitted into a `width` by `height` box at `(x, y)`.
    ///
    /// The box size and `fitmethod=auto` are defaults; options given
    /// here override them.
    pub fn place_image(
        &self,
        image: &Image,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        options: OptionList,
    ) -> Result<()> {
        self.adapter
            .fit_image(image, x, y, options.merge_over(&Self::box_defaults(width, height)))
    }

    /// Place a vector graphic fitted into a `width` by `height` box at
    /// `(x, y)`.
    pub fn place_graphics(
        &self,
        graphics: &Graphics,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        options: OptionList,
    ) -> Result<()> {
        self.adapter
            .fit_graphics(graphics, x, y, options.merge_over(&Self::box_defaults(width, height)))
    }

    fn box_defaults(width: f64, height: f64) -> OptionList {
        OptionList::new()
            .with("boxsize", [width, height])
            .with("fitmethod", "auto")
    }

    // ------------------------------------------------------------------
    // Tables and textflows
    // ------------------------------------------------------------------

    /// Start building a table.
    pub fn new_table(&self) -> Table {
        Table::new(&self.adapter)
    }

    /// Place the next chunk of a table into a box whose top-left corner
    /// is `(x, y)`, measured from the top of the page.
    ///
    /// Returns `true` while rows remain for another box.
    pub fn place_table(
        &self,
        table: &Table,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        options: OptionList,
    ) -> Result<bool> {
        if !table.handle_ref().is_issued() {
            return Err(Error::Unissued("table"));
        }
        let result = self
            .adapter
            .fit_table(table, x, y + height, x + width, y, options)?;
        Ok(result != FIT_STOP)
    }

    /// Prepare a text flow in `font` at `size` points.
    pub fn new_textflow(
        &self,
        font: &Font,
        size: f64,
        text: &str,
        options: OptionList,
    ) -> Result<Textflow> {
        Textflow::create(&self.adapter, font, size, text, options)
    }

    /// Place the next chunk of a text flow into a box whose top-left
    /// corner is `(x, y)`, measured from the top of the page.
    ///
    /// Returns `true` while text remains for another box.
    pub fn place_textflow(
        &self,
        textflow: &Textflow,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        options: OptionList,
    ) -> Result<bool> {
        let result = self
            .adapter
            .fit_textflow(textflow, x, y + height, x + width, y, options)?;
        Ok(result != FIT_STOP)
    }

    // ------------------------------------------------------------------
    // Drawing and page decoration
    // ------------------------------------------------------------------

    /// Run vector drawing inside a saved graphics context.
    ///
    /// The context is restored afterwards even when the closure fails,
    /// and the closure's error wins over any restore error.
    pub fn draw(&self, sketch: impl FnOnce(&Drawing) -> Result<()>) -> Result<()> {
        self.adapter.save()?;
        let outcome = sketch(&Drawing::new(&self.adapter));
        let restored = self.adapter.restore();
        outcome?;
        restored
    }

    /// Define an axial or radial shading between two points.
    #[allow(clippy::too_many_arguments)]
    pub fn new_shading(
        &self,
        kind: ShadingKind,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        start: &Color,
        end: &Color,
        options: OptionList,
    ) -> Result<Shading> {
        Shading::create(&self.adapter, kind, x0, y0, x1, y1, start, end, options)
    }

    /// Fill the current clip area with a shading.
    pub fn fill_shading(&self, shading: &Shading) -> Result<()> {
        shading.fill()
    }

    /// Define an optional content layer.
    pub fn new_layer(&self, name: &str, options: OptionList) -> Result<Layer> {
        Layer::define(&self.adapter, name, options)
    }

    /// Declare a viewer-side relationship between defined layers.
    pub fn set_layer_dependency(
        &self,
        dependency: LayerDependency,
        options: OptionList,
    ) -> Result<()> {
        self.adapter
            .set_layer_dependency(dependency.as_str(), options)
    }

    /// Create a reusable graphics state.
    pub fn new_graphics_state(&self, options: OptionList) -> Result<GraphicsState> {
        GraphicsState::create(&self.adapter, options)
    }

    // ------------------------------------------------------------------
    // Engine options
    // ------------------------------------------------------------------

    /// Set a global engine option.
    pub fn set_option(&self, key: &str, value: impl Into<OptionValue>) -> Result<()> {
        self.adapter.set_option(key, value)
    }

    /// Read a global engine option as a number.
    pub fn get_option(&self, key: &str) -> Result<f64> {
        self.adapter.get_option(key, OptionList::new())
    }

    /// Whether the engine knows `key` as an option at all.
    pub fn option_exists(&self, key: &str) -> Result<bool> {
        self.adapter.option_exists(key)
    }
}
