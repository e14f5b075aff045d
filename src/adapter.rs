//! Engine session.
//!
//! [`Adapter`] owns one engine instance and exposes one typed method per
//! primitive. Every method encodes its option argument through
//! [`OptionList`], resolves resource references to raw handles, forwards
//! the call, and wraps returned handles in typed [`HandleRef`]s. Primitives
//! are never retried: re-issuing a structural call against the stateful
//! engine corrupts document state, so failures always propagate.

use std::cell::{RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::color::{Color, PaintMode};
use crate::engine::{Engine, Scope};
use crate::error::{Error, Result};
use crate::handle::{HandleKind, HandleRef, Handleable};
use crate::options::{OptionList, OptionValue};

/// Session over a single engine instance.
///
/// Cloning is cheap and shares the same underlying engine; resources hold
/// their own clone so they can release handles when dropped. The session
/// is single-threaded by construction, matching the engine's own model.
#[derive(Clone)]
pub struct Adapter {
    // Exclusive engine access; a borrow never outlives one primitive call.
    engine: Rc<RefCell<dyn Engine>>,
}

impl Adapter {
    /// Create a session and apply the baseline engine configuration:
    /// errors are reported as failures rather than silent sentinel
    /// returns, and all strings cross the boundary as UTF-8.
    pub fn new(engine: impl Engine + 'static) -> Result<Self> {
        log::debug!("Starting engine session");
        let adapter = Self {
            engine: Rc::new(RefCell::new(engine)),
        };
        adapter.set_option("errorpolicy", "exception")?;
        adapter.set_option("stringformat", "utf8")?;
        Ok(adapter)
    }

    fn engine(&self) -> RefMut<'_, dyn Engine> {
        self.engine.borrow_mut()
    }

    // --- Global options ---

    /// Set a single global option.
    pub fn set_option(&self, key: &str, value: impl Into<OptionValue>) -> Result<()> {
        let optlist = OptionList::new().with(key, value).encode();
        self.engine().set_option(&optlist)?;
        Ok(())
    }

    /// Read a global option as a number (or string index).
    pub fn get_option(&self, key: &str, options: OptionList) -> Result<f64> {
        Ok(self.engine().get_option(key, &options.encode())?)
    }

    /// Resolve a string index returned by [`Adapter::get_option`].
    pub fn get_string(&self, index: i32, options: OptionList) -> Result<String> {
        Ok(self.engine().get_string(index, &options.encode())?)
    }

    /// Probe whether a global option exists. The engine reports a missing
    /// option with a dedicated error code, which is the only engine error
    /// this library ever converts into a value.
    pub fn option_exists(&self, key: &str) -> Result<bool> {
        match self.engine().get_option(key, "") {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    // --- Scope ---

    /// Read the engine's current scope. Queried fresh on every call; the
    /// scope changes as a side effect of nearly every primitive.
    pub fn scope(&self) -> Result<Scope> {
        let index = self.engine().get_option("scope", "")? as i32;
        let name = self.engine().get_string(index, "")?;
        Scope::from_name(&name).ok_or(Error::UnknownScope(name))
    }

    /// Whether the engine is currently in the given scope.
    pub fn is_scope(&self, scope: Scope) -> Result<bool> {
        Ok(self.scope()? == scope)
    }

    // --- Document ---

    /// Begin a document; without a filename the engine renders to memory.
    pub fn begin_document(&self, filename: Option<&str>, options: OptionList) -> Result<()> {
        log::debug!("Beginning document: {}", filename.unwrap_or("<memory>"));
        self.engine()
            .begin_document(filename.unwrap_or(""), &options.encode())?;
        Ok(())
    }

    /// Finish the document.
    pub fn end_document(&self, options: OptionList) -> Result<()> {
        log::debug!("Ending document");
        self.engine().end_document(&options.encode())?;
        Ok(())
    }

    /// Fetch the rendered bytes of an in-memory document.
    pub fn get_buffer(&self) -> Result<Vec<u8>> {
        let buffer = self.engine().get_buffer()?;
        log::debug!("Fetched document buffer: {} bytes", buffer.len());
        Ok(buffer)
    }

    // --- Pages ---

    /// Open a new page.
    pub fn begin_page(&self, width: f64, height: f64, options: OptionList) -> Result<()> {
        self.engine()
            .begin_page_ext(width, height, &options.encode())?;
        Ok(())
    }

    /// Close the current page.
    pub fn end_page(&self, options: OptionList) -> Result<()> {
        self.engine().end_page_ext(&options.encode())?;
        Ok(())
    }

    /// Park the current page so another can be opened or resumed.
    pub fn suspend_page(&self, options: OptionList) -> Result<()> {
        self.engine().suspend_page(&options.encode())?;
        Ok(())
    }

    /// Reopen a suspended page; the page number travels in the options.
    pub fn resume_page(&self, options: OptionList) -> Result<()> {
        self.engine().resume_page(&options.encode())?;
        Ok(())
    }

    /// Scale the coordinate system of the current page.
    pub fn scale(&self, sx: f64, sy: f64) -> Result<()> {
        self.engine().scale(sx, sy)?;
        Ok(())
    }

    // --- Fonts ---

    /// Load a font. The encoding defaults to `unicode`.
    pub fn load_font(
        &self,
        name: &str,
        encoding: Option<&str>,
        options: OptionList,
    ) -> Result<HandleRef> {
        let encoding = encoding.unwrap_or("unicode");
        log::debug!("Loading font: {name} ({encoding})");
        let raw = self
            .engine()
            .load_font(name, encoding, &options.encode())?;
        Ok(HandleRef::new(HandleKind::Font, raw))
    }

    /// Query a font metric.
    pub fn info_font(&self, font: &impl Handleable, key: &str, options: OptionList) -> Result<f64> {
        Ok(self
            .engine()
            .info_font(font.handle(), key, &options.encode())?)
    }

    // --- Images ---

    /// Load an image. The format defaults to `auto` detection.
    pub fn load_image(
        &self,
        filename: &str,
        imagetype: Option<&str>,
        options: OptionList,
    ) -> Result<HandleRef> {
        let imagetype = imagetype.unwrap_or("auto");
        log::debug!("Loading image: {filename} ({imagetype})");
        let raw = self
            .engine()
            .load_image(imagetype, filename, &options.encode())?;
        Ok(HandleRef::new(HandleKind::Image, raw))
    }

    /// Release an image handle.
    pub fn close_image(&self, image: &impl Handleable) -> Result<()> {
        self.engine().close_image(image.handle())?;
        Ok(())
    }

    /// Place an image on the current page.
    pub fn fit_image(
        &self,
        image: &impl Handleable,
        x: f64,
        y: f64,
        options: OptionList,
    ) -> Result<()> {
        self.engine()
            .fit_image(image.handle(), x, y, &options.encode())?;
        Ok(())
    }

    /// Query an image property.
    pub fn info_image(
        &self,
        image: &impl Handleable,
        key: &str,
        options: OptionList,
    ) -> Result<f64> {
        Ok(self
            .engine()
            .info_image(image.handle(), key, &options.encode())?)
    }

    // --- Vector graphics ---

    /// Load a vector graphic. The format defaults to `auto` detection.
    pub fn load_graphics(
        &self,
        filename: &str,
        graphicstype: Option<&str>,
        options: OptionList,
    ) -> Result<HandleRef> {
        let graphicstype = graphicstype.unwrap_or("auto");
        log::debug!("Loading graphics: {filename} ({graphicstype})");
        let raw = self
            .engine()
            .load_graphics(graphicstype, filename, &options.encode())?;
        Ok(HandleRef::new(HandleKind::Graphics, raw))
    }

    /// Release a graphics handle.
    pub fn close_graphics(&self, graphics: &impl Handleable) -> Result<()> {
        self.engine().close_graphics(graphics.handle())?;
        Ok(())
    }

    /// Place a vector graphic on the current page.
    pub fn fit_graphics(
        &self,
        graphics: &impl Handleable,
        x: f64,
        y: f64,
        options: OptionList,
    ) -> Result<()> {
        self.engine()
            .fit_graphics(graphics.handle(), x, y, &options.encode())?;
        Ok(())
    }

    /// Query a graphics property.
    pub fn info_graphics(
        &self,
        graphics: &impl Handleable,
        key: &str,
        options: OptionList,
    ) -> Result<f64> {
        Ok(self
            .engine()
            .info_graphics(graphics.handle(), key, &options.encode())?)
    }

    // --- Virtual files ---

    /// Register in-memory bytes under a virtual path.
    pub fn create_pvf(&self, path: &str, contents: &[u8], options: OptionList) -> Result<()> {
        self.engine()
            .create_pvf(path, contents, &options.encode())?;
        Ok(())
    }

    /// Remove a virtual file registration.
    pub fn delete_pvf(&self, path: &str) -> Result<()> {
        self.engine().delete_pvf(path)?;
        Ok(())
    }

    /// Query a virtual file property.
    pub fn info_pvf(&self, path: &str, key: &str) -> Result<f64> {
        Ok(self.engine().info_pvf(path, key)?)
    }

    // --- Textflows ---

    /// Create a textflow from initial content.
    pub fn create_textflow(&self, text: &str, options: OptionList) -> Result<HandleRef> {
        let raw = self.engine().create_textflow(text, &options.encode())?;
        Ok(HandleRef::new(HandleKind::Textflow, raw))
    }

    /// Append content to a textflow. The engine may reissue the handle,
    /// so the shared reference is updated in place.
    pub fn add_textflow(&self, textflow: &HandleRef, text: &str, options: OptionList) -> Result<()> {
        let raw = self
            .engine()
            .add_textflow(textflow.get(), text, &options.encode())?;
        textflow.set(raw);
        Ok(())
    }

    /// Place (part of) a textflow into a rectangle; returns the engine's
    /// placement state string.
    pub fn fit_textflow(
        &self,
        textflow: &impl Handleable,
        llx: f64,
        lly: f64,
        urx: f64,
        ury: f64,
        options: OptionList,
    ) -> Result<String> {
        Ok(self.engine().fit_textflow(
            textflow.handle(),
            llx,
            lly,
            urx,
            ury,
            &options.encode(),
        )?)
    }

    /// Query a textflow metric.
    pub fn info_textflow(&self, textflow: &impl Handleable, key: &str) -> Result<f64> {
        Ok(self.engine().info_textflow(textflow.handle(), key)?)
    }

    // --- Tables ---

    /// Add a table cell. The engine may reissue the handle, so the shared
    /// reference is updated in place.
    pub fn add_table_cell(
        &self,
        table: &HandleRef,
        column: u32,
        row: u32,
        text: &str,
        options: OptionList,
    ) -> Result<()> {
        let raw = self.engine().add_table_cell(
            table.get(),
            column,
            row,
            text,
            &options.encode(),
        )?;
        table.set(raw);
        Ok(())
    }

    /// Place (part of) a table into a rectangle; returns the engine's
    /// placement state string.
    pub fn fit_table(
        &self,
        table: &impl Handleable,
        llx: f64,
        lly: f64,
        urx: f64,
        ury: f64,
        options: OptionList,
    ) -> Result<String> {
        Ok(self
            .engine()
            .fit_table(table.handle(), llx, lly, urx, ury, &options.encode())?)
    }

    /// Query a table metric.
    pub fn info_table(&self, table: &impl Handleable, key: &str) -> Result<f64> {
        Ok(self.engine().info_table(table.handle(), key)?)
    }

    // --- Imported documents ---

    /// Open an external document for import.
    pub fn open_pdi_document(&self, filename: &str, options: OptionList) -> Result<HandleRef> {
        log::debug!("Opening document for import: {filename}");
        let raw = self
            .engine()
            .open_pdi_document(filename, &options.encode())?;
        Ok(HandleRef::new(HandleKind::Document, raw))
    }

    /// Close an imported document.
    pub fn close_pdi_document(&self, document: &impl Handleable) -> Result<()> {
        self.engine().close_pdi_document(document.handle())?;
        Ok(())
    }

    /// Open a page of an imported document.
    pub fn open_pdi_page(
        &self,
        document: &impl Handleable,
        pagenumber: u32,
        options: OptionList,
    ) -> Result<HandleRef> {
        let raw =
            self.engine()
                .open_pdi_page(document.handle(), pagenumber, &options.encode())?;
        Ok(HandleRef::new(HandleKind::Page, raw))
    }

    /// Close an imported page.
    pub fn close_pdi_page(&self, page: &impl Handleable) -> Result<()> {
        self.engine().close_pdi_page(page.handle())?;
        Ok(())
    }

    /// Place an imported page on the current output page.
    pub fn fit_pdi_page(
        &self,
        page: &impl Handleable,
        x: f64,
        y: f64,
        options: OptionList,
    ) -> Result<()> {
        self.engine()
            .fit_pdi_page(page.handle(), x, y, &options.encode())?;
        Ok(())
    }

    /// Query an imported-page property.
    pub fn info_pdi_page(
        &self,
        page: &impl Handleable,
        key: &str,
        options: OptionList,
    ) -> Result<f64> {
        Ok(self
            .engine()
            .info_pdi_page(page.handle(), key, &options.encode())?)
    }

    // --- Imported-document object tree ---

    /// Read a numeric value from an imported document's object tree.
    pub fn pcos_get_number(&self, document: &impl Handleable, path: &str) -> Result<f64> {
        Ok(self.engine().pcos_get_number(document.handle(), path)?)
    }

    /// Read a string value from an imported document's object tree.
    pub fn pcos_get_string(&self, document: &impl Handleable, path: &str) -> Result<String> {
        Ok(self.engine().pcos_get_string(document.handle(), path)?)
    }

    /// Read stream contents from an imported document's object tree.
    /// The engine takes the option list before the path.
    pub fn pcos_get_stream(
        &self,
        document: &impl Handleable,
        path: &str,
        options: OptionList,
    ) -> Result<Vec<u8>> {
        Ok(self
            .engine()
            .pcos_get_stream(document.handle(), &options.encode(), path)?)
    }

    // --- Template blocks ---

    /// Fill a text block on an imported page.
    pub fn fill_text_block(
        &self,
        page: &impl Handleable,
        name: &str,
        contents: &str,
        options: OptionList,
    ) -> Result<()> {
        self.engine()
            .fill_textblock(page.handle(), name, contents, &options.encode())?;
        Ok(())
    }

    /// Fill an image block on an imported page.
    pub fn fill_image_block(
        &self,
        page: &impl Handleable,
        name: &str,
        image: &impl Handleable,
        options: OptionList,
    ) -> Result<()> {
        self.engine()
            .fill_imageblock(page.handle(), name, image.handle(), &options.encode())?;
        Ok(())
    }

    /// Fill a graphics block on an imported page.
    pub fn fill_graphics_block(
        &self,
        page: &impl Handleable,
        name: &str,
        graphics: &impl Handleable,
        options: OptionList,
    ) -> Result<()> {
        self.engine().fill_graphicsblock(
            page.handle(),
            name,
            graphics.handle(),
            &options.encode(),
        )?;
        Ok(())
    }

    /// Fill a PDF block on an imported page with another imported page.
    pub fn fill_pdf_block(
        &self,
        page: &impl Handleable,
        name: &str,
        contents: &impl Handleable,
        options: OptionList,
    ) -> Result<()> {
        self.engine()
            .fill_pdfblock(page.handle(), name, contents.handle(), &options.encode())?;
        Ok(())
    }

    // --- Color ---

    /// Register a named spot color.
    pub fn make_spot_color(&self, name: &str) -> Result<HandleRef> {
        let raw = self.engine().makespotcolor(name)?;
        Ok(HandleRef::new(HandleKind::SpotColor, raw))
    }

    /// Set the current color for the given paint mode.
    pub fn set_color(&self, mode: PaintMode, color: &Color) -> Result<()> {
        let (colorspace, c) = color.components()?;
        self.engine()
            .setcolor(mode.as_str(), colorspace, c[0], c[1], c[2], c[3])?;
        Ok(())
    }

    // --- Vector paths ---

    /// Set the stroke line width.
    pub fn set_line_width(&self, width: f64) -> Result<()> {
        self.engine().setlinewidth(width)?;
        Ok(())
    }

    /// Start a path at the given point.
    pub fn move_to(&self, x: f64, y: f64) -> Result<()> {
        self.engine().moveto(x, y)?;
        Ok(())
    }

    /// Extend the current path with a straight segment.
    pub fn line_to(&self, x: f64, y: f64) -> Result<()> {
        self.engine().lineto(x, y)?;
        Ok(())
    }

    /// Add a rectangle subpath.
    pub fn rect(&self, x: f64, y: f64, width: f64, height: f64) -> Result<()> {
        self.engine().rect(x, y, width, height)?;
        Ok(())
    }

    /// Add a circle subpath.
    pub fn circle(&self, x: f64, y: f64, r: f64) -> Result<()> {
        self.engine().circle(x, y, r)?;
        Ok(())
    }

    /// Stroke and clear the current path.
    pub fn stroke(&self) -> Result<()> {
        self.engine().stroke()?;
        Ok(())
    }

    /// Fill and clear the current path.
    pub fn fill(&self) -> Result<()> {
        self.engine().fill()?;
        Ok(())
    }

    /// Fill and stroke the current path in one pass.
    pub fn fill_stroke(&self) -> Result<()> {
        self.engine().fill_stroke()?;
        Ok(())
    }

    /// Push the graphics state.
    pub fn save(&self) -> Result<()> {
        self.engine().save()?;
        Ok(())
    }

    /// Pop the graphics state.
    pub fn restore(&self) -> Result<()> {
        self.engine().restore()?;
        Ok(())
    }

    // --- Shadings ---

    /// Define a color gradient between two points.
    #[allow(clippy::too_many_arguments)]
    pub fn shading(
        &self,
        shtype: &str,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        c: [f64; 4],
        options: OptionList,
    ) -> Result<HandleRef> {
        let raw = self.engine().shading(
            shtype,
            x0,
            y0,
            x1,
            y1,
            c[0],
            c[1],
            c[2],
            c[3],
            &options.encode(),
        )?;
        Ok(HandleRef::new(HandleKind::Shading, raw))
    }

    /// Fill the clipping area with a shading.
    pub fn shading_fill(&self, shading: &impl Handleable) -> Result<()> {
        self.engine().shfill(shading.handle())?;
        Ok(())
    }

    // --- Layers ---

    /// Define an optional-content layer.
    pub fn define_layer(&self, name: &str, options: OptionList) -> Result<HandleRef> {
        let raw = self.engine().define_layer(name, &options.encode())?;
        Ok(HandleRef::new(HandleKind::Layer, raw))
    }

    /// Declare a viewer-side relationship between layers.
    pub fn set_layer_dependency(&self, deptype: &str, options: OptionList) -> Result<()> {
        self.engine()
            .set_layer_dependency(deptype, &options.encode())?;
        Ok(())
    }

    /// Route subsequent page output into a layer.
    pub fn begin_layer(&self, layer: &impl Handleable) -> Result<()> {
        self.engine().begin_layer(layer.handle())?;
        Ok(())
    }

    /// Deactivate all active layers.
    pub fn end_layer(&self) -> Result<()> {
        self.engine().end_layer()?;
        Ok(())
    }

    // --- Graphics states ---

    /// Create an explicit graphics state object.
    pub fn create_graphics_state(&self, options: OptionList) -> Result<HandleRef> {
        let raw = self.engine().create_gstate(&options.encode())?;
        Ok(HandleRef::new(HandleKind::GraphicsState, raw))
    }

    /// Apply a graphics state object.
    pub fn set_graphics_state(&self, gstate: &impl Handleable) -> Result<()> {
        self.engine().set_gstate(gstate.handle())?;
        Ok(())
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEngine;

    fn session() -> (Adapter, crate::testing::EngineProbe) {
        let engine = FakeEngine::new();
        let probe = engine.probe();
        let adapter = Adapter::new(engine).unwrap();
        (adapter, probe)
    }

    #[test]
    fn test_new_applies_baseline_options() {
        let (_, probe) = session();
        let calls = probe.calls();
        assert!(calls.contains(&"set_option errorpolicy=exception".to_string()));
        assert!(calls.contains(&"set_option stringformat=utf8".to_string()));
    }

    #[test]
    fn test_scope_reads_through_string_table() {
        let (adapter, _) = session();
        assert_eq!(adapter.scope().unwrap(), Scope::Object);
        adapter.begin_document(None, OptionList::new()).unwrap();
        assert_eq!(adapter.scope().unwrap(), Scope::Document);
        assert!(adapter.is_scope(Scope::Document).unwrap());
        assert!(!adapter.is_scope(Scope::Page).unwrap());
    }

    #[test]
    fn test_option_exists_downgrades_only_missing_option_code() {
        let engine = FakeEngine::new().with_option("pdfa", 1.0);
        let adapter = Adapter::new(engine).unwrap();
        assert!(adapter.option_exists("pdfa").unwrap());
        assert!(!adapter.option_exists("nonexistent").unwrap());
    }

    #[test]
    fn test_option_exists_propagates_other_errors() {
        let engine = FakeEngine::new().with_option_error("broken", 1000, "internal failure");
        let adapter = Adapter::new(engine).unwrap();
        assert!(adapter.option_exists("broken").is_err());
    }

    #[test]
    fn test_load_font_wraps_handle() {
        let (adapter, _) = session();
        adapter.begin_document(None, OptionList::new()).unwrap();
        let font = adapter
            .load_font("Helvetica", None, OptionList::new())
            .unwrap();
        assert_eq!(font.kind(), HandleKind::Font);
        assert!(font.is_issued());
    }

    #[test]
    fn test_add_textflow_updates_shared_handle() {
        let (adapter, _) = session();
        adapter.begin_document(None, OptionList::new()).unwrap();
        let tf = HandleRef::unissued(HandleKind::Textflow);
        adapter.add_textflow(&tf, "hello", OptionList::new()).unwrap();
        assert!(tf.is_issued());
    }

    #[test]
    fn test_set_color_decomposes() {
        let (adapter, probe) = session();
        adapter.begin_document(None, OptionList::new()).unwrap();
        adapter.begin_page(595.0, 842.0, OptionList::new()).unwrap();
        adapter
            .set_color(PaintMode::Stroke, &Color::rgb(255, 0, 0))
            .unwrap();
        assert!(probe
            .calls()
            .contains(&"setcolor stroke rgb 1 0 0 0".to_string()));
    }
}
