//! Engine capability boundary.
//!
//! Provides a trait-based interface over the external document-generation
//! engine, isolating its stateful, handle-based C-style API from the typed
//! object model. Implementations wrap a concrete engine binding (or, for
//! tests, the scripted [`FakeEngine`](crate::testing::FakeEngine)), with
//! one trait method per documented primitive, raw strings and integers only.
//! All option arguments are preformatted option lists (see
//! [`options`](crate::options)).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handle::RawHandle;

/// Result type for primitive engine calls.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Engine error code for "option or resource does not exist".
///
/// The existence probe ([`Adapter::option_exists`](crate::adapter::Adapter::option_exists))
/// downgrades exactly this code to `false`; every other code is fatal.
pub const OPTION_NOT_FOUND: i32 = 1202;

/// A failure reported by the engine for a rejected primitive.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{api}: {message} (engine error {code})")]
pub struct EngineError {
    /// Numeric engine error code.
    pub code: i32,
    /// Name of the rejected primitive.
    pub api: String,
    /// Engine-supplied description.
    pub message: String,
}

impl EngineError {
    /// Create a new engine error.
    pub fn new(code: i32, api: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            api: api.into(),
            message: message.into(),
        }
    }

    /// Whether this is the "option or resource does not exist" code.
    pub fn is_not_found(&self) -> bool {
        self.code == OPTION_NOT_FOUND
    }
}

/// The engine's current phase.
///
/// The scope restricts which primitives are legal and changes as a side
/// effect of nearly every call, so it is queried on demand and never cached
/// (see [`Adapter::scope`](crate::adapter::Adapter::scope)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// No document in progress; document-lifetime resources are engine-owned.
    Object,
    /// A document is open but no page is current.
    Document,
    Glyph,
    Font,
    Pattern,
    Template,
    /// A page is open for writing.
    Page,
    /// A vector path is under construction.
    Path,
}

impl Scope {
    /// Canonical engine name of the scope.
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Object => "object",
            Scope::Document => "document",
            Scope::Glyph => "glyph",
            Scope::Font => "font",
            Scope::Pattern => "pattern",
            Scope::Template => "template",
            Scope::Page => "page",
            Scope::Path => "path",
        }
    }

    /// Parse the engine's scope name.
    pub fn from_name(name: &str) -> Option<Scope> {
        match name {
            "object" => Some(Scope::Object),
            "document" => Some(Scope::Document),
            "glyph" => Some(Scope::Glyph),
            "font" => Some(Scope::Font),
            "pattern" => Some(Scope::Pattern),
            "template" => Some(Scope::Template),
            "page" => Some(Scope::Page),
            "path" => Some(Scope::Path),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Abstract interface to the document engine's primitive set.
///
/// The engine is stateful and single-threaded: one instance holds one
/// implicit document/page cursor, and every method may advance its internal
/// scope machine. An implementation is exclusively owned by one
/// [`Adapter`](crate::adapter::Adapter); primitives either complete or
/// return an [`EngineError`]; they are never retried, since re-issuing a
/// structural call (e.g. beginning a page twice) corrupts document state.
pub trait Engine {
    // --- Global options and introspection ---

    /// Set a global option (`key=value` option list).
    fn set_option(&mut self, optlist: &str) -> EngineResult<()>;

    /// Read a global option; the result is a number or a string index.
    fn get_option(&mut self, key: &str, optlist: &str) -> EngineResult<f64>;

    /// Resolve a string index returned by [`Engine::get_option`].
    fn get_string(&mut self, index: i32, optlist: &str) -> EngineResult<String>;

    // --- Document ---

    /// Start a document; an empty filename keeps output in memory.
    fn begin_document(&mut self, filename: &str, optlist: &str) -> EngineResult<()>;

    /// Finish the document.
    fn end_document(&mut self, optlist: &str) -> EngineResult<()>;

    /// Fetch the in-memory document bytes after [`Engine::end_document`].
    fn get_buffer(&mut self) -> EngineResult<Vec<u8>>;

    // --- Pages ---

    /// Open a new page for writing.
    fn begin_page_ext(&mut self, width: f64, height: f64, optlist: &str) -> EngineResult<()>;

    /// Close the current page.
    fn end_page_ext(&mut self, optlist: &str) -> EngineResult<()>;

    /// Park the current page so another can become current.
    fn suspend_page(&mut self, optlist: &str) -> EngineResult<()>;

    /// Reopen a suspended page (`pagenumber` passed in the option list).
    fn resume_page(&mut self, optlist: &str) -> EngineResult<()>;

    // --- Transformations ---

    fn scale(&mut self, sx: f64, sy: f64) -> EngineResult<()>;

    // --- Fonts ---

    fn load_font(&mut self, name: &str, encoding: &str, optlist: &str) -> EngineResult<RawHandle>;

    fn info_font(&mut self, font: RawHandle, key: &str, optlist: &str) -> EngineResult<f64>;

    // --- Images ---

    fn load_image(
        &mut self,
        imagetype: &str,
        filename: &str,
        optlist: &str,
    ) -> EngineResult<RawHandle>;

    fn close_image(&mut self, image: RawHandle) -> EngineResult<()>;

    fn fit_image(&mut self, image: RawHandle, x: f64, y: f64, optlist: &str) -> EngineResult<()>;

    fn info_image(&mut self, image: RawHandle, key: &str, optlist: &str) -> EngineResult<f64>;

    // --- Vector graphics files (SVG) ---

    fn load_graphics(
        &mut self,
        graphicstype: &str,
        filename: &str,
        optlist: &str,
    ) -> EngineResult<RawHandle>;

    fn close_graphics(&mut self, graphics: RawHandle) -> EngineResult<()>;

    fn fit_graphics(
        &mut self,
        graphics: RawHandle,
        x: f64,
        y: f64,
        optlist: &str,
    ) -> EngineResult<()>;

    fn info_graphics(&mut self, graphics: RawHandle, key: &str, optlist: &str)
        -> EngineResult<f64>;

    // --- Virtual files ---

    /// Register an in-memory byte buffer under a virtual path.
    fn create_pvf(&mut self, filename: &str, data: &[u8], optlist: &str) -> EngineResult<()>;

    /// Remove a virtual file registration.
    fn delete_pvf(&mut self, filename: &str) -> EngineResult<()>;

    fn info_pvf(&mut self, filename: &str, key: &str) -> EngineResult<f64>;

    // --- Textflows ---

    fn create_textflow(&mut self, text: &str, optlist: &str) -> EngineResult<RawHandle>;

    /// Append to a textflow; returns the (possibly reissued) handle.
    fn add_textflow(
        &mut self,
        textflow: RawHandle,
        text: &str,
        optlist: &str,
    ) -> EngineResult<RawHandle>;

    /// Place a textflow; returns the engine state string (`_stop`, `_boxfull`, ...).
    fn fit_textflow(
        &mut self,
        textflow: RawHandle,
        llx: f64,
        lly: f64,
        urx: f64,
        ury: f64,
        optlist: &str,
    ) -> EngineResult<String>;

    fn info_textflow(&mut self, textflow: RawHandle, key: &str) -> EngineResult<f64>;

    // --- Tables ---

    /// Add a cell; `table` may be [`NO_HANDLE`](crate::handle::NO_HANDLE) to
    /// start a new table. Returns the (possibly reissued) handle.
    fn add_table_cell(
        &mut self,
        table: RawHandle,
        column: u32,
        row: u32,
        text: &str,
        optlist: &str,
    ) -> EngineResult<RawHandle>;

    /// Place a table (fragment); returns the engine state string.
    fn fit_table(
        &mut self,
        table: RawHandle,
        llx: f64,
        lly: f64,
        urx: f64,
        ury: f64,
        optlist: &str,
    ) -> EngineResult<String>;

    fn info_table(&mut self, table: RawHandle, key: &str) -> EngineResult<f64>;

    // --- Imported documents (PDI) ---

    fn open_pdi_document(&mut self, filename: &str, optlist: &str) -> EngineResult<RawHandle>;

    fn close_pdi_document(&mut self, document: RawHandle) -> EngineResult<()>;

    fn open_pdi_page(
        &mut self,
        document: RawHandle,
        pagenumber: u32,
        optlist: &str,
    ) -> EngineResult<RawHandle>;

    fn close_pdi_page(&mut self, page: RawHandle) -> EngineResult<()>;

    fn fit_pdi_page(&mut self, page: RawHandle, x: f64, y: f64, optlist: &str)
        -> EngineResult<()>;

    fn info_pdi_page(&mut self, page: RawHandle, key: &str, optlist: &str) -> EngineResult<f64>;

    // --- pCOS (imported-document object tree) ---

    fn pcos_get_number(&mut self, document: RawHandle, path: &str) -> EngineResult<f64>;

    fn pcos_get_string(&mut self, document: RawHandle, path: &str) -> EngineResult<String>;

    /// Note the engine's argument order: option list before path.
    fn pcos_get_stream(
        &mut self,
        document: RawHandle,
        optlist: &str,
        path: &str,
    ) -> EngineResult<Vec<u8>>;

    // --- Block filling (PPS) ---

    fn fill_textblock(
        &mut self,
        page: RawHandle,
        blockname: &str,
        text: &str,
        optlist: &str,
    ) -> EngineResult<()>;

    fn fill_imageblock(
        &mut self,
        page: RawHandle,
        blockname: &str,
        image: RawHandle,
        optlist: &str,
    ) -> EngineResult<()>;

    fn fill_graphicsblock(
        &mut self,
        page: RawHandle,
        blockname: &str,
        graphics: RawHandle,
        optlist: &str,
    ) -> EngineResult<()>;

    fn fill_pdfblock(
        &mut self,
        page: RawHandle,
        blockname: &str,
        contents: RawHandle,
        optlist: &str,
    ) -> EngineResult<()>;

    // --- Color ---

    fn makespotcolor(&mut self, spotname: &str) -> EngineResult<RawHandle>;

    fn setcolor(
        &mut self,
        fstype: &str,
        colorspace: &str,
        c1: f64,
        c2: f64,
        c3: f64,
        c4: f64,
    ) -> EngineResult<()>;

    // --- Vector paths and painting ---

    fn setlinewidth(&mut self, width: f64) -> EngineResult<()>;

    fn moveto(&mut self, x: f64, y: f64) -> EngineResult<()>;

    fn lineto(&mut self, x: f64, y: f64) -> EngineResult<()>;

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> EngineResult<()>;

    fn circle(&mut self, x: f64, y: f64, r: f64) -> EngineResult<()>;

    fn stroke(&mut self) -> EngineResult<()>;

    fn fill(&mut self) -> EngineResult<()>;

    fn fill_stroke(&mut self) -> EngineResult<()>;

    fn save(&mut self) -> EngineResult<()>;

    fn restore(&mut self) -> EngineResult<()>;

    // --- Shadings ---

    #[allow(clippy::too_many_arguments)]
    fn shading(
        &mut self,
        shtype: &str,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        c1: f64,
        c2: f64,
        c3: f64,
        c4: f64,
        optlist: &str,
    ) -> EngineResult<RawHandle>;

    fn shfill(&mut self, shading: RawHandle) -> EngineResult<()>;

    // --- Layers ---

    fn define_layer(&mut self, name: &str, optlist: &str) -> EngineResult<RawHandle>;

    fn set_layer_dependency(&mut self, deptype: &str, optlist: &str) -> EngineResult<()>;

    fn begin_layer(&mut self, layer: RawHandle) -> EngineResult<()>;

    fn end_layer(&mut self) -> EngineResult<()>;

    // --- Graphics state objects ---

    fn create_gstate(&mut self, optlist: &str) -> EngineResult<RawHandle>;

    fn set_gstate(&mut self, gstate: RawHandle) -> EngineResult<()>;
}
