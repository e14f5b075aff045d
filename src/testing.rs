//! Test support: a scripted in-memory engine.
//!
//! [`FakeEngine`] implements the full [`Engine`](crate::engine::Engine)
//! surface without producing any real output. It simulates the parts that
//! matter for driving logic: the scope state machine, page numbering with
//! suspend/resume bookkeeping, handle issuance, virtual-file registration,
//! and the missing-option error code. Everything else is scripted: tests
//! preload option values, object-tree entries, and placement results, then
//! inspect the recorded call log through an [`EngineProbe`].
//!
//! ```
//! use enpdf::adapter::Adapter;
//! use enpdf::options::OptionList;
//! use enpdf::testing::FakeEngine;
//!
//! let engine = FakeEngine::new();
//! let probe = engine.probe();
//! let adapter = Adapter::new(engine).unwrap();
//! adapter.begin_document(None, OptionList::new()).unwrap();
//! assert!(probe.called("begin_document"));
//! ```

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use crate::engine::{Engine, EngineError, EngineResult, Scope, OPTION_NOT_FOUND};
use crate::handle::{RawHandle, NO_HANDLE};

fn wrong_scope(api: &str, scope: Scope) -> EngineError {
    EngineError::new(
        2100,
        api,
        format!("function must not be called in '{scope}' scope"),
    )
}

fn missing_path(api: &str, path: &str) -> EngineError {
    EngineError::new(1206, api, format!("no scripted value at '{path}'"))
}

// Pull one `key=value` number out of a flat option list string. The fake
// only ever needs this for simple lists like `pagenumber=3`.
fn option_number(optlist: &str, key: &str) -> Option<f64> {
    optlist.split_whitespace().find_map(|entry| {
        entry
            .strip_prefix(key)
            .and_then(|rest| rest.strip_prefix('='))
            .and_then(|value| value.parse().ok())
    })
}

#[derive(Debug)]
struct FakeState {
    calls: Vec<String>,
    scope: Scope,
    next_handle: RawHandle,
    page_count: u32,
    current_page: u32,
    suspended: BTreeSet<u32>,
    strings: Vec<String>,
    buffer: Vec<u8>,
    options: HashMap<String, f64>,
    option_errors: HashMap<String, EngineError>,
    failures: HashMap<String, EngineError>,
    info: HashMap<String, f64>,
    pcos_strings: HashMap<String, String>,
    pcos_numbers: HashMap<String, f64>,
    pcos_streams: HashMap<String, Vec<u8>>,
    fit_results: VecDeque<String>,
    pvf: HashMap<String, Vec<u8>>,
    spot_colors: HashMap<String, RawHandle>,
    open_documents: HashSet<RawHandle>,
    open_pages: HashSet<RawHandle>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            scope: Scope::Object,
            next_handle: 1,
            page_count: 0,
            current_page: 0,
            suspended: BTreeSet::new(),
            strings: Vec::new(),
            buffer: b"%PDF-1.7\n%fake\n%%EOF\n".to_vec(),
            options: HashMap::new(),
            option_errors: HashMap::new(),
            failures: HashMap::new(),
            info: HashMap::new(),
            pcos_strings: HashMap::new(),
            pcos_numbers: HashMap::new(),
            pcos_streams: HashMap::new(),
            fit_results: VecDeque::new(),
            pvf: HashMap::new(),
            spot_colors: HashMap::new(),
            open_documents: HashSet::new(),
            open_pages: HashSet::new(),
        }
    }
}

impl FakeState {
    // Record the call, then fail it if the test scripted a failure for
    // this primitive. Failed calls still show up in the log.
    fn enter(&mut self, api: &str, detail: &str) -> EngineResult<()> {
        let line = if detail.is_empty() {
            api.to_string()
        } else {
            format!("{api} {detail}")
        };
        self.calls.push(line);
        match self.failures.get(api) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn require(&self, api: &str, allowed: bool) -> EngineResult<()> {
        if allowed {
            Ok(())
        } else {
            Err(wrong_scope(api, self.scope))
        }
    }

    fn issue(&mut self) -> RawHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn in_body(&self) -> bool {
        matches!(self.scope, Scope::Document | Scope::Page)
    }
}

/// Scripted engine double for tests.
///
/// All state lives behind a shared cell so an [`EngineProbe`] taken before
/// the engine moves into an adapter stays connected to it.
#[derive(Debug, Default)]
pub struct FakeEngine {
    state: Rc<RefCell<FakeState>>,
}

impl FakeEngine {
    /// Create a fake engine in `object` scope with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// A probe sharing this engine's state, for assertions after the
    /// engine has been handed to an adapter.
    pub fn probe(&self) -> EngineProbe {
        EngineProbe {
            state: Rc::clone(&self.state),
        }
    }

    /// Script a readable global option value.
    pub fn with_option(self, key: &str, value: f64) -> Self {
        self.state
            .borrow_mut()
            .options
            .insert(key.to_string(), value);
        self
    }

    /// Script a non-missing failure for reading one global option.
    pub fn with_option_error(self, key: &str, code: i32, message: &str) -> Self {
        self.state.borrow_mut().option_errors.insert(
            key.to_string(),
            EngineError::new(code, "get_option", message),
        );
        self
    }

    /// Script a persistent failure for one primitive by name.
    pub fn with_api_error(self, api: &str, code: i32, message: &str) -> Self {
        self.state
            .borrow_mut()
            .failures
            .insert(api.to_string(), EngineError::new(code, api, message));
        self
    }

    /// Script the value every `info_*` primitive returns for a key.
    pub fn with_info(self, key: &str, value: f64) -> Self {
        self.state.borrow_mut().info.insert(key.to_string(), value);
        self
    }

    /// Script an object-tree string (also used for `type:` pseudo paths).
    pub fn with_pcos_string(self, path: &str, value: &str) -> Self {
        self.state
            .borrow_mut()
            .pcos_strings
            .insert(path.to_string(), value.to_string());
        self
    }

    /// Script an object-tree number (also used for `length:` pseudo paths).
    pub fn with_pcos_number(self, path: &str, value: f64) -> Self {
        self.state
            .borrow_mut()
            .pcos_numbers
            .insert(path.to_string(), value);
        self
    }

    /// Script an object-tree stream.
    pub fn with_pcos_stream(self, path: &str, value: &[u8]) -> Self {
        self.state
            .borrow_mut()
            .pcos_streams
            .insert(path.to_string(), value.to_vec());
        self
    }

    /// Queue a placement result for the next `fit_textflow`/`fit_table`
    /// call. When the queue is empty those calls return `_stop`.
    pub fn with_fit_result(self, result: &str) -> Self {
        self.state
            .borrow_mut()
            .fit_results
            .push_back(result.to_string());
        self
    }

    /// Replace the bytes returned by `get_buffer`.
    pub fn with_buffer(self, bytes: &[u8]) -> Self {
        self.state.borrow_mut().buffer = bytes.to_vec();
        self
    }
}

/// Read-only view into a [`FakeEngine`]'s recorded state.
#[derive(Debug, Clone)]
pub struct EngineProbe {
    state: Rc<RefCell<FakeState>>,
}

impl EngineProbe {
    /// All recorded calls in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    /// Whether any recorded call starts with the given prefix.
    pub fn called(&self, prefix: &str) -> bool {
        self.state
            .borrow()
            .calls
            .iter()
            .any(|call| call.starts_with(prefix))
    }

    /// Number of recorded calls starting with the given prefix.
    pub fn count(&self, prefix: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// The engine's current scope.
    pub fn scope(&self) -> Scope {
        self.state.borrow().scope
    }

    /// Page numbers currently suspended, ascending.
    pub fn suspended(&self) -> Vec<u32> {
        self.state.borrow().suspended.iter().copied().collect()
    }

    /// The page currently open for writing (0 when none).
    pub fn current_page(&self) -> u32 {
        self.state.borrow().current_page
    }

    /// Total pages begun so far.
    pub fn page_count(&self) -> u32 {
        self.state.borrow().page_count
    }

    /// Paths of virtual files still registered.
    pub fn pvf_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.state.borrow().pvf.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl Engine for FakeEngine {
    fn set_option(&mut self, optlist: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("set_option", optlist)
    }

    fn get_option(&mut self, key: &str, optlist: &str) -> EngineResult<f64> {
        let mut s = self.state.borrow_mut();
        s.enter("get_option", &format!("{key} {optlist}").trim_end())?;
        if key == "scope" {
            let name = s.scope.as_str().to_string();
            s.strings.push(name);
            return Ok((s.strings.len() - 1) as f64);
        }
        if let Some(err) = s.option_errors.get(key) {
            return Err(err.clone());
        }
        match s.options.get(key) {
            Some(value) => Ok(*value),
            None => Err(EngineError::new(
                OPTION_NOT_FOUND,
                "get_option",
                format!("unknown option '{key}'"),
            )),
        }
    }

    fn get_string(&mut self, index: i32, optlist: &str) -> EngineResult<String> {
        let mut s = self.state.borrow_mut();
        s.enter("get_string", &format!("{index} {optlist}").trim_end())?;
        s.strings
            .get(index as usize)
            .cloned()
            .ok_or_else(|| EngineError::new(1204, "get_string", format!("bad index {index}")))
    }

    fn begin_document(&mut self, filename: &str, optlist: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        let name = if filename.is_empty() { "<memory>" } else { filename };
        s.enter("begin_document", &format!("{name} {optlist}").trim_end())?;
        s.require("begin_document", s.scope == Scope::Object)?;
        s.scope = Scope::Document;
        s.page_count = 0;
        s.current_page = 0;
        s.suspended.clear();
        Ok(())
    }

    fn end_document(&mut self, optlist: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("end_document", optlist)?;
        s.require("end_document", s.scope == Scope::Document)?;
        if !s.suspended.is_empty() {
            return Err(EngineError::new(
                2101,
                "end_document",
                "suspended pages must be resumed and closed first",
            ));
        }
        s.scope = Scope::Object;
        Ok(())
    }

    fn get_buffer(&mut self) -> EngineResult<Vec<u8>> {
        let mut s = self.state.borrow_mut();
        s.enter("get_buffer", "")?;
        s.require("get_buffer", s.scope == Scope::Object)?;
        Ok(s.buffer.clone())
    }

    fn begin_page_ext(&mut self, width: f64, height: f64, optlist: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "begin_page_ext",
            &format!("{width}x{height} {optlist}").trim_end(),
        )?;
        s.require("begin_page_ext", s.scope == Scope::Document)?;
        s.page_count += 1;
        s.current_page = s.page_count;
        s.scope = Scope::Page;
        Ok(())
    }

    fn end_page_ext(&mut self, optlist: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("end_page_ext", optlist)?;
        s.require("end_page_ext", s.scope == Scope::Page)?;
        s.current_page = 0;
        s.scope = Scope::Document;
        Ok(())
    }

    fn suspend_page(&mut self, optlist: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("suspend_page", optlist)?;
        s.require("suspend_page", s.scope == Scope::Page)?;
        let page = s.current_page;
        s.suspended.insert(page);
        s.current_page = 0;
        s.scope = Scope::Document;
        Ok(())
    }

    fn resume_page(&mut self, optlist: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("resume_page", optlist)?;
        s.require("resume_page", s.scope == Scope::Document)?;
        let page = option_number(optlist, "pagenumber")
            .map(|n| n as u32)
            .ok_or_else(|| EngineError::new(1203, "resume_page", "missing pagenumber option"))?;
        if !s.suspended.remove(&page) {
            return Err(EngineError::new(
                2102,
                "resume_page",
                format!("page {page} is not suspended"),
            ));
        }
        s.current_page = page;
        s.scope = Scope::Page;
        Ok(())
    }

    fn scale(&mut self, sx: f64, sy: f64) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("scale", &format!("{sx} {sy}"))?;
        s.require("scale", s.scope == Scope::Page)
    }

    fn load_font(&mut self, name: &str, encoding: &str, optlist: &str) -> EngineResult<RawHandle> {
        let mut s = self.state.borrow_mut();
        s.enter("load_font", &format!("{name} {encoding} {optlist}").trim_end())?;
        s.require("load_font", s.in_body())?;
        Ok(s.issue())
    }

    fn info_font(&mut self, font: RawHandle, key: &str, _optlist: &str) -> EngineResult<f64> {
        let mut s = self.state.borrow_mut();
        s.enter("info_font", &format!("{font} {key}"))?;
        Ok(s.info.get(key).copied().unwrap_or(0.0))
    }

    fn load_image(
        &mut self,
        imagetype: &str,
        filename: &str,
        optlist: &str,
    ) -> EngineResult<RawHandle> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "load_image",
            &format!("{imagetype} {filename} {optlist}").trim_end(),
        )?;
        s.require("load_image", s.in_body())?;
        Ok(s.issue())
    }

    fn close_image(&mut self, image: RawHandle) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("close_image", &image.to_string())?;
        s.require("close_image", s.scope != Scope::Object)
    }

    fn fit_image(&mut self, image: RawHandle, x: f64, y: f64, optlist: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("fit_image", &format!("{image} {x} {y} {optlist}").trim_end())?;
        s.require("fit_image", s.scope == Scope::Page)
    }

    fn info_image(&mut self, image: RawHandle, key: &str, _optlist: &str) -> EngineResult<f64> {
        let mut s = self.state.borrow_mut();
        s.enter("info_image", &format!("{image} {key}"))?;
        Ok(s.info.get(key).copied().unwrap_or(0.0))
    }

    fn load_graphics(
        &mut self,
        graphicstype: &str,
        filename: &str,
        optlist: &str,
    ) -> EngineResult<RawHandle> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "load_graphics",
            &format!("{graphicstype} {filename} {optlist}").trim_end(),
        )?;
        s.require("load_graphics", s.in_body())?;
        Ok(s.issue())
    }

    fn close_graphics(&mut self, graphics: RawHandle) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("close_graphics", &graphics.to_string())?;
        s.require("close_graphics", s.scope != Scope::Object)
    }

    fn fit_graphics(
        &mut self,
        graphics: RawHandle,
        x: f64,
        y: f64,
        optlist: &str,
    ) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "fit_graphics",
            &format!("{graphics} {x} {y} {optlist}").trim_end(),
        )?;
        s.require("fit_graphics", s.scope == Scope::Page)
    }

    fn info_graphics(
        &mut self,
        graphics: RawHandle,
        key: &str,
        _optlist: &str,
    ) -> EngineResult<f64> {
        let mut s = self.state.borrow_mut();
        s.enter("info_graphics", &format!("{graphics} {key}"))?;
        Ok(s.info.get(key).copied().unwrap_or(0.0))
    }

    fn create_pvf(&mut self, filename: &str, data: &[u8], optlist: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "create_pvf",
            &format!("{filename} {} bytes {optlist}", data.len()).trim_end(),
        )?;
        if s.pvf.contains_key(filename) {
            return Err(EngineError::new(
                1203,
                "create_pvf",
                format!("virtual file '{filename}' already exists"),
            ));
        }
        s.pvf.insert(filename.to_string(), data.to_vec());
        Ok(())
    }

    fn delete_pvf(&mut self, filename: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("delete_pvf", filename)?;
        match s.pvf.remove(filename) {
            Some(_) => Ok(()),
            None => Err(EngineError::new(
                1203,
                "delete_pvf",
                format!("virtual file '{filename}' does not exist"),
            )),
        }
    }

    fn info_pvf(&mut self, filename: &str, key: &str) -> EngineResult<f64> {
        let mut s = self.state.borrow_mut();
        s.enter("info_pvf", &format!("{filename} {key}"))?;
        match key {
            "exists" => Ok(if s.pvf.contains_key(filename) { 1.0 } else { 0.0 }),
            "size" => Ok(s.pvf.get(filename).map(|d| d.len() as f64).unwrap_or(0.0)),
            _ => Ok(0.0),
        }
    }

    fn create_textflow(&mut self, text: &str, optlist: &str) -> EngineResult<RawHandle> {
        let mut s = self.state.borrow_mut();
        s.enter("create_textflow", &format!("{text} {optlist}").trim_end())?;
        s.require("create_textflow", s.in_body())?;
        Ok(s.issue())
    }

    fn add_textflow(
        &mut self,
        textflow: RawHandle,
        text: &str,
        optlist: &str,
    ) -> EngineResult<RawHandle> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "add_textflow",
            &format!("{textflow} {text} {optlist}").trim_end(),
        )?;
        s.require("add_textflow", s.in_body())?;
        if textflow == NO_HANDLE {
            Ok(s.issue())
        } else {
            Ok(textflow)
        }
    }

    fn fit_textflow(
        &mut self,
        textflow: RawHandle,
        llx: f64,
        lly: f64,
        urx: f64,
        ury: f64,
        optlist: &str,
    ) -> EngineResult<String> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "fit_textflow",
            &format!("{textflow} {llx} {lly} {urx} {ury} {optlist}").trim_end(),
        )?;
        s.require("fit_textflow", s.scope == Scope::Page)?;
        Ok(s.fit_results.pop_front().unwrap_or_else(|| "_stop".to_string()))
    }

    fn info_textflow(&mut self, textflow: RawHandle, key: &str) -> EngineResult<f64> {
        let mut s = self.state.borrow_mut();
        s.enter("info_textflow", &format!("{textflow} {key}"))?;
        Ok(s.info.get(key).copied().unwrap_or(0.0))
    }

    fn add_table_cell(
        &mut self,
        table: RawHandle,
        column: u32,
        row: u32,
        text: &str,
        optlist: &str,
    ) -> EngineResult<RawHandle> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "add_table_cell",
            &format!("{table} col={column} row={row} {text} {optlist}").trim_end(),
        )?;
        s.require("add_table_cell", s.in_body())?;
        if table == NO_HANDLE {
            Ok(s.issue())
        } else {
            Ok(table)
        }
    }

    fn fit_table(
        &mut self,
        table: RawHandle,
        llx: f64,
        lly: f64,
        urx: f64,
        ury: f64,
        optlist: &str,
    ) -> EngineResult<String> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "fit_table",
            &format!("{table} {llx} {lly} {urx} {ury} {optlist}").trim_end(),
        )?;
        s.require("fit_table", s.scope == Scope::Page)?;
        Ok(s.fit_results.pop_front().unwrap_or_else(|| "_stop".to_string()))
    }

    fn info_table(&mut self, table: RawHandle, key: &str) -> EngineResult<f64> {
        let mut s = self.state.borrow_mut();
        s.enter("info_table", &format!("{table} {key}"))?;
        Ok(s.info.get(key).copied().unwrap_or(0.0))
    }

    fn open_pdi_document(&mut self, filename: &str, optlist: &str) -> EngineResult<RawHandle> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "open_pdi_document",
            &format!("{filename} {optlist}").trim_end(),
        )?;
        let handle = s.issue();
        s.open_documents.insert(handle);
        Ok(handle)
    }

    fn close_pdi_document(&mut self, document: RawHandle) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("close_pdi_document", &document.to_string())?;
        if !s.open_documents.remove(&document) {
            return Err(EngineError::new(
                1205,
                "close_pdi_document",
                format!("document handle {document} is not open"),
            ));
        }
        Ok(())
    }

    fn open_pdi_page(
        &mut self,
        document: RawHandle,
        pagenumber: u32,
        optlist: &str,
    ) -> EngineResult<RawHandle> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "open_pdi_page",
            &format!("{document} {pagenumber} {optlist}").trim_end(),
        )?;
        s.require("open_pdi_page", s.scope != Scope::Object)?;
        if !s.open_documents.contains(&document) {
            return Err(EngineError::new(
                1205,
                "open_pdi_page",
                format!("document handle {document} is not open"),
            ));
        }
        let handle = s.issue();
        s.open_pages.insert(handle);
        Ok(handle)
    }

    fn close_pdi_page(&mut self, page: RawHandle) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("close_pdi_page", &page.to_string())?;
        s.require("close_pdi_page", s.scope != Scope::Object)?;
        if !s.open_pages.remove(&page) {
            return Err(EngineError::new(
                1205,
                "close_pdi_page",
                format!("page handle {page} is not open"),
            ));
        }
        Ok(())
    }

    fn fit_pdi_page(&mut self, page: RawHandle, x: f64, y: f64, optlist: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "fit_pdi_page",
            &format!("{page} {x} {y} {optlist}").trim_end(),
        )?;
        s.require("fit_pdi_page", s.scope == Scope::Page)
    }

    fn info_pdi_page(&mut self, page: RawHandle, key: &str, _optlist: &str) -> EngineResult<f64> {
        let mut s = self.state.borrow_mut();
        s.enter("info_pdi_page", &format!("{page} {key}"))?;
        Ok(s.info.get(key).copied().unwrap_or(0.0))
    }

    fn pcos_get_number(&mut self, document: RawHandle, path: &str) -> EngineResult<f64> {
        let mut s = self.state.borrow_mut();
        s.enter("pcos_get_number", &format!("{document} {path}"))?;
        if !s.open_documents.contains(&document) {
            return Err(missing_path("pcos_get_number", path));
        }
        if let Some(value) = s.pcos_numbers.get(path) {
            return Ok(*value);
        }
        // Unscripted length queries follow the engine convention: zero
        // for anything that is not a container.
        if path.starts_with("length:") {
            return Ok(0.0);
        }
        Err(missing_path("pcos_get_number", path))
    }

    fn pcos_get_string(&mut self, document: RawHandle, path: &str) -> EngineResult<String> {
        let mut s = self.state.borrow_mut();
        s.enter("pcos_get_string", &format!("{document} {path}"))?;
        if !s.open_documents.contains(&document) {
            return Err(missing_path("pcos_get_string", path));
        }
        if let Some(value) = s.pcos_strings.get(path) {
            return Ok(value.clone());
        }
        // Unscripted type queries read as the absent type.
        if path.starts_with("type:") {
            return Ok("null".to_string());
        }
        Err(missing_path("pcos_get_string", path))
    }

    fn pcos_get_stream(
        &mut self,
        document: RawHandle,
        optlist: &str,
        path: &str,
    ) -> EngineResult<Vec<u8>> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "pcos_get_stream",
            &format!("{document} {path} {optlist}").trim_end(),
        )?;
        if !s.open_documents.contains(&document) {
            return Err(missing_path("pcos_get_stream", path));
        }
        s.pcos_streams
            .get(path)
            .cloned()
            .ok_or_else(|| missing_path("pcos_get_stream", path))
    }

    fn fill_textblock(
        &mut self,
        page: RawHandle,
        blockname: &str,
        text: &str,
        optlist: &str,
    ) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "fill_textblock",
            &format!("{page} {blockname} {text} {optlist}").trim_end(),
        )?;
        s.require("fill_textblock", s.scope == Scope::Page)
    }

    fn fill_imageblock(
        &mut self,
        page: RawHandle,
        blockname: &str,
        image: RawHandle,
        optlist: &str,
    ) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "fill_imageblock",
            &format!("{page} {blockname} {image} {optlist}").trim_end(),
        )?;
        s.require("fill_imageblock", s.scope == Scope::Page)
    }

    fn fill_graphicsblock(
        &mut self,
        page: RawHandle,
        blockname: &str,
        graphics: RawHandle,
        optlist: &str,
    ) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "fill_graphicsblock",
            &format!("{page} {blockname} {graphics} {optlist}").trim_end(),
        )?;
        s.require("fill_graphicsblock", s.scope == Scope::Page)
    }

    fn fill_pdfblock(
        &mut self,
        page: RawHandle,
        blockname: &str,
        contents: RawHandle,
        optlist: &str,
    ) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "fill_pdfblock",
            &format!("{page} {blockname} {contents} {optlist}").trim_end(),
        )?;
        s.require("fill_pdfblock", s.scope == Scope::Page)
    }

    fn makespotcolor(&mut self, spotname: &str) -> EngineResult<RawHandle> {
        let mut s = self.state.borrow_mut();
        s.enter("makespotcolor", spotname)?;
        s.require("makespotcolor", s.scope != Scope::Object)?;
        if let Some(handle) = s.spot_colors.get(spotname) {
            return Ok(*handle);
        }
        let handle = s.issue();
        s.spot_colors.insert(spotname.to_string(), handle);
        Ok(handle)
    }

    fn setcolor(
        &mut self,
        fstype: &str,
        colorspace: &str,
        c1: f64,
        c2: f64,
        c3: f64,
        c4: f64,
    ) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "setcolor",
            &format!("{fstype} {colorspace} {c1} {c2} {c3} {c4}"),
        )?;
        s.require("setcolor", s.in_body())
    }

    fn setlinewidth(&mut self, width: f64) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("setlinewidth", &width.to_string())?;
        s.require("setlinewidth", s.in_body())
    }

    fn moveto(&mut self, x: f64, y: f64) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("moveto", &format!("{x} {y}"))?;
        s.require("moveto", matches!(s.scope, Scope::Page | Scope::Path))?;
        s.scope = Scope::Path;
        Ok(())
    }

    fn lineto(&mut self, x: f64, y: f64) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("lineto", &format!("{x} {y}"))?;
        s.require("lineto", s.scope == Scope::Path)
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("rect", &format!("{x} {y} {width} {height}"))?;
        s.require("rect", matches!(s.scope, Scope::Page | Scope::Path))?;
        s.scope = Scope::Path;
        Ok(())
    }

    fn circle(&mut self, x: f64, y: f64, r: f64) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("circle", &format!("{x} {y} {r}"))?;
        s.require("circle", matches!(s.scope, Scope::Page | Scope::Path))?;
        s.scope = Scope::Path;
        Ok(())
    }

    fn stroke(&mut self) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("stroke", "")?;
        s.require("stroke", s.scope == Scope::Path)?;
        s.scope = Scope::Page;
        Ok(())
    }

    fn fill(&mut self) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("fill", "")?;
        s.require("fill", s.scope == Scope::Path)?;
        s.scope = Scope::Page;
        Ok(())
    }

    fn fill_stroke(&mut self) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("fill_stroke", "")?;
        s.require("fill_stroke", s.scope == Scope::Path)?;
        s.scope = Scope::Page;
        Ok(())
    }

    fn save(&mut self) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("save", "")?;
        s.require("save", s.scope == Scope::Page)
    }

    fn restore(&mut self) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("restore", "")?;
        s.require("restore", s.scope == Scope::Page)
    }

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
    ) -> EngineResult<RawHandle> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "shading",
            &format!("{shtype} {x0} {y0} {x1} {y1} {c1} {c2} {c3} {c4} {optlist}").trim_end(),
        )?;
        s.require("shading", s.in_body())?;
        Ok(s.issue())
    }

    fn shfill(&mut self, shading: RawHandle) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("shfill", &shading.to_string())?;
        s.require("shfill", s.scope == Scope::Page)
    }

    fn define_layer(&mut self, name: &str, optlist: &str) -> EngineResult<RawHandle> {
        let mut s = self.state.borrow_mut();
        s.enter("define_layer", &format!("{name} {optlist}").trim_end())?;
        s.require("define_layer", s.in_body())?;
        Ok(s.issue())
    }

    fn set_layer_dependency(&mut self, deptype: &str, optlist: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter(
            "set_layer_dependency",
            &format!("{deptype} {optlist}").trim_end(),
        )?;
        s.require("set_layer_dependency", s.in_body())
    }

    fn begin_layer(&mut self, layer: RawHandle) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("begin_layer", &layer.to_string())?;
        s.require("begin_layer", s.scope == Scope::Page)
    }

    fn end_layer(&mut self) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("end_layer", "")?;
        s.require("end_layer", s.scope == Scope::Page)
    }

    fn create_gstate(&mut self, optlist: &str) -> EngineResult<RawHandle> {
        let mut s = self.state.borrow_mut();
        s.enter("create_gstate", optlist)?;
        s.require("create_gstate", s.scope != Scope::Object)?;
        Ok(s.issue())
    }

    fn set_gstate(&mut self, gstate: RawHandle) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.enter("set_gstate", &gstate.to_string())?;
        s.require("set_gstate", s.in_body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_machine() {
        let mut engine = FakeEngine::new();
        assert!(engine.begin_page_ext(595.0, 842.0, "").is_err());

        engine.begin_document("", "").unwrap();
        engine.begin_page_ext(595.0, 842.0, "").unwrap();
        assert_eq!(engine.probe().scope(), Scope::Page);

        engine.suspend_page("").unwrap();
        assert_eq!(engine.probe().suspended(), vec![1]);

        engine.resume_page("pagenumber=1").unwrap();
        assert_eq!(engine.probe().current_page(), 1);
        assert!(engine.probe().suspended().is_empty());
    }

    #[test]
    fn test_resume_requires_suspended_page() {
        let mut engine = FakeEngine::new();
        engine.begin_document("", "").unwrap();
        let err = engine.resume_page("pagenumber=4").unwrap_err();
        assert_eq!(err.code, 2102);
    }

    #[test]
    fn test_end_document_rejects_dangling_suspends() {
        let mut engine = FakeEngine::new();
        engine.begin_document("", "").unwrap();
        engine.begin_page_ext(100.0, 100.0, "").unwrap();
        engine.suspend_page("").unwrap();
        assert!(engine.end_document("").is_err());
    }

    #[test]
    fn test_handles_are_monotonic() {
        let mut engine = FakeEngine::new();
        engine.begin_document("", "").unwrap();
        let a = engine.load_font("Helvetica", "unicode", "").unwrap();
        let b = engine.load_font("Courier", "unicode", "").unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_pvf_registration_is_exclusive() {
        let mut engine = FakeEngine::new();
        engine.create_pvf("/pvf/a", b"data", "").unwrap();
        assert!(engine.create_pvf("/pvf/a", b"data", "").is_err());
        engine.delete_pvf("/pvf/a").unwrap();
        assert!(engine.delete_pvf("/pvf/a").is_err());
    }

    #[test]
    fn test_unscripted_pcos_defaults() {
        let mut engine = FakeEngine::new();
        let doc = engine.open_pdi_document("in.pdf", "").unwrap();
        assert_eq!(engine.pcos_get_string(doc, "type:nothing").unwrap(), "null");
        assert_eq!(engine.pcos_get_number(doc, "length:nothing").unwrap(), 0.0);
        assert!(engine.pcos_get_string(doc, "nothing").is_err());
    }

    #[test]
    fn test_path_scope_transitions() {
        let mut engine = FakeEngine::new();
        engine.begin_document("", "").unwrap();
        engine.begin_page_ext(100.0, 100.0, "").unwrap();
        engine.moveto(0.0, 0.0).unwrap();
        assert!(engine.begin_page_ext(100.0, 100.0, "").is_err());
        engine.lineto(50.0, 50.0).unwrap();
        engine.stroke().unwrap();
        assert_eq!(engine.probe().scope(), Scope::Page);
    }
}
