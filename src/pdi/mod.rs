//! Imported PDF documents and their pages.
//!
//! Existing PDFs come in as in-memory bytes, spooled through the engine's
//! virtual file system, and stay open for introspection and placement
//! until closed. Pages are opened lazily and cached; each page exposes
//! its template blocks and a page-relative view of the introspection
//! tree.
//!
//! # Example
//!
//! ```
//! use enpdf::builder::PdfBuilder;
//! use enpdf::options::OptionList;
//! use enpdf::testing::FakeEngine;
//!
//! fn main() -> enpdf::Result<()> {
//!     let engine = FakeEngine::new().with_pcos_number("length:pages", 2.0);
//!     let pdf = PdfBuilder::new(engine)?;
//!
//!     let template = pdf.import(b"%PDF-1.7 fake", OptionList::new())?;
//!     assert_eq!(template.page_count(), 2);
//!     assert!(template.has_page(2));
//!     Ok(())
//! }
//! ```

mod block;
mod pcos;

pub use block::{Block, BlockCollection, BlockContent, BlockKind};
pub use pcos::{Pcos, PcosDict, PcosEntries, PcosValue};

use std::cell::{Cell, OnceCell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::adapter::Adapter;
use crate::asset::spooled;
use crate::engine::Scope;
use crate::error::{Error, Result};
use crate::handle::{HandleKind, HandleRef, Handleable};
use crate::options::OptionList;
use crate::pdi::block::lowercase_keys;

/// An imported PDF, open in the engine for introspection and placement.
#[derive(Debug)]
pub struct PdiDocument {
    adapter: Adapter,
    handle: HandleRef,
    pcos: Pcos,
    total_pages: u32,
    pages: RefCell<HashMap<u32, Rc<PdiPage>>>,
    released: Cell<bool>,
}

impl PdiDocument {
    /// Open a document from in-memory bytes via the virtual file system.
    pub(crate) fn open(adapter: &Adapter, contents: &[u8], options: OptionList) -> Result<Self> {
        let handle = spooled(adapter, contents, |path| {
            adapter.open_pdi_document(path, options)
        })?;
        let pcos = Pcos::new(adapter, &handle);
        let total_pages = pcos.length("pages")?;
        log::debug!("Imported document with {total_pages} pages");
        Ok(Self {
            adapter: adapter.clone(),
            handle,
            pcos,
            total_pages,
            pages: RefCell::new(HashMap::new()),
            released: Cell::new(false),
        })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.total_pages
    }

    /// Whether the 1-based page number exists.
    pub fn has_page(&self, number: u32) -> bool {
        number >= 1 && number <= self.total_pages
    }

    /// Get a page, opening it on first access.
    pub fn page(&self, number: u32, options: OptionList) -> Result<Rc<PdiPage>> {
        if !self.has_page(number) {
            return Err(Error::PageOutOfRange(number, self.total_pages));
        }
        if let Some(page) = self.pages.borrow().get(&number) {
            return Ok(Rc::clone(page));
        }
        let page = Rc::new(PdiPage::open(
            &self.adapter,
            &self.handle,
            &self.pcos,
            number,
            options,
        )?);
        self.pages.borrow_mut().insert(number, Rc::clone(&page));
        Ok(page)
    }

    /// Iterate all pages in order, opening them as needed.
    pub fn pages(&self) -> impl Iterator<Item = Result<Rc<PdiPage>>> + '_ {
        (1..=self.total_pages).map(|number| self.page(number, OptionList::new()))
    }

    /// Introspect the document at a path.
    pub fn pcos(&self, path: &str) -> Result<PcosValue> {
        self.pcos.get(path)
    }

    /// The introspection subtree at a path as JSON.
    pub fn pcos_json(&self, path: &str) -> Result<serde_json::Value> {
        self.pcos.get_json(path)
    }

    /// The introspection accessor bound to this document.
    pub fn pcos_ref(&self) -> &Pcos {
        &self.pcos
    }

    /// Release the document handle.
    pub fn close(&self) -> Result<()> {
        if self.released.replace(true) {
            return Err(Error::Closed("imported document"));
        }
        self.adapter.close_pdi_document(&self.handle)
    }
}

impl Handleable for PdiDocument {
    fn handle_ref(&self) -> &HandleRef {
        &self.handle
    }
}

impl Drop for PdiDocument {
    fn drop(&mut self) {
        if self.released.get() {
            return;
        }
        if let Err(err) = self.close() {
            log::warn!("Failed to close imported document on drop: {err}");
        }
    }
}

/// One page of an imported document.
///
/// Outside `object` scope the page gets an engine handle and can be
/// placed or filled; inside `object` scope it is a metadata-only view
/// whose introspection still works but whose handle stays unissued.
#[derive(Debug)]
pub struct PdiPage {
    adapter: Adapter,
    handle: HandleRef,
    pcos: Pcos,
    number: u32,
    blocks: OnceCell<BlockCollection>,
    released: Cell<bool>,
}

impl PdiPage {
    pub(crate) fn open(
        adapter: &Adapter,
        document: &HandleRef,
        pcos: &Pcos,
        number: u32,
        options: OptionList,
    ) -> Result<Self> {
        let handle = if adapter.is_scope(Scope::Object)? {
            log::debug!("Page {number} opened as metadata-only view in object scope");
            HandleRef::unissued(HandleKind::Page)
        } else {
            adapter.open_pdi_page(document, number, options)?
        };
        Ok(Self {
            adapter: adapter.clone(),
            handle,
            pcos: pcos.clone(),
            number,
            blocks: OnceCell::new(),
            released: Cell::new(false),
        })
    }

    /// The 1-based page number within its document.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Query a page property such as `width` or `rotate`.
    pub fn info(&self, key: &str, options: OptionList) -> Result<f64> {
        if !self.handle.is_issued() {
            return Err(Error::Unissued("imported page"));
        }
        self.adapter.info_pdi_page(self, key, options)
    }

    /// Page width in points.
    pub fn width(&self) -> Result<f64> {
        self.info("width", OptionList::new())
    }

    /// Page height in points.
    pub fn height(&self) -> Result<f64> {
        self.info("height", OptionList::new())
    }

    /// Introspect the page subtree; paths are relative to this page.
    pub fn pcos(&self, path: &str) -> Result<PcosValue> {
        self.pcos.get(&self.page_path(path))
    }

    fn page_path(&self, path: &str) -> String {
        format!("pages[{}]/{path}", self.number - 1)
    }

    /// The template blocks declared on this page, discovered once.
    pub fn blocks(&self) -> Result<&BlockCollection> {
        if let Some(blocks) = self.blocks.get() {
            return Ok(blocks);
        }
        let loaded = self.load_blocks()?;
        Ok(self.blocks.get_or_init(|| loaded))
    }

    /// A block by name, if the page declares one.
    pub fn block(&self, name: &str) -> Result<Option<&Block>> {
        Ok(self.blocks()?.get(name))
    }

    fn load_blocks(&self) -> Result<BlockCollection> {
        let mut blocks = IndexMap::new();
        match self.pcos("blocks")? {
            PcosValue::Dict(dict) => {
                for entry in dict.entries() {
                    let (key, value) = entry?;
                    let properties = match value.as_dict() {
                        Some(dict) => lowercase_keys(dict.to_map()?),
                        None => continue,
                    };
                    if let Some(block) =
                        Block::from_properties(&self.adapter, &self.handle, &key, properties)?
                    {
                        blocks.insert(block.name().to_owned(), block);
                    }
                }
            }
            // Some producers expose the block list as a plain array.
            PcosValue::Array(values) => {
                for (index, value) in values.iter().enumerate() {
                    let properties = match value.as_dict() {
                        Some(dict) => lowercase_keys(dict.to_map()?),
                        None => continue,
                    };
                    let key = index.to_string();
                    if let Some(block) =
                        Block::from_properties(&self.adapter, &self.handle, &key, properties)?
                    {
                        blocks.insert(block.name().to_owned(), block);
                    }
                }
            }
            _ => {}
        }
        Ok(BlockCollection::new(blocks))
    }

    /// Release the page handle.
    ///
    /// A no-op for metadata-only views and once the engine is back in
    /// `object` scope.
    pub fn close(&self) -> Result<()> {
        if self.released.replace(true) {
            return Err(Error::Closed("imported page"));
        }
        if !self.handle.is_issued() {
            return Ok(());
        }
        if self.adapter.is_scope(Scope::Object)? {
            log::debug!("Skipping imported page close in object scope");
            return Ok(());
        }
        self.adapter.close_pdi_page(&self.handle)
    }
}

impl Handleable for PdiPage {
    fn handle_ref(&self) -> &HandleRef {
        &self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEngine;

    fn engine_with_template(pages: f64) -> FakeEngine {
        FakeEngine::new().with_pcos_number("length:pages", pages)
    }

    fn document_scope(engine: FakeEngine) -> (Adapter, crate::testing::EngineProbe) {
        let probe = engine.probe();
        let adapter = Adapter::new(engine).unwrap();
        adapter.begin_document(None, OptionList::new()).unwrap();
        (adapter, probe)
    }

    #[test]
    fn test_import_spools_bytes_and_counts_pages() {
        let (adapter, probe) = document_scope(engine_with_template(3.0));
        let document = PdiDocument::open(&adapter, b"%PDF-1.4", OptionList::new()).unwrap();

        assert_eq!(document.page_count(), 3);
        assert!(document.has_page(1));
        assert!(document.has_page(3));
        assert!(!document.has_page(4));
        assert!(probe.called("create_pvf /pvf/"));
        assert!(probe.called("open_pdi_document /pvf/"));
        assert!(probe.pvf_paths().is_empty());
    }

    #[test]
    fn test_page_numbers_are_bounds_checked() {
        let (adapter, _probe) = document_scope(engine_with_template(2.0));
        let document = PdiDocument::open(&adapter, b"%PDF-1.4", OptionList::new()).unwrap();

        assert!(matches!(
            document.page(0, OptionList::new()),
            Err(Error::PageOutOfRange(0, 2))
        ));
        assert!(matches!(
            document.page(3, OptionList::new()),
            Err(Error::PageOutOfRange(3, 2))
        ));
    }

    #[test]
    fn test_pages_open_once_and_are_cached() {
        let (adapter, probe) = document_scope(engine_with_template(2.0));
        let document = PdiDocument::open(&adapter, b"%PDF-1.4", OptionList::new()).unwrap();

        let first = document.page(1, OptionList::new()).unwrap();
        let again = document.page(1, OptionList::new()).unwrap();
        assert!(Rc::ptr_eq(&first, &again));
        assert_eq!(probe.count("open_pdi_page"), 1);
        assert!(first.handle() > 0);
        assert_eq!(first.number(), 1);
    }

    #[test]
    fn test_object_scope_yields_metadata_only_pages() {
        let engine = engine_with_template(1.0);
        let probe = engine.probe();
        let adapter = Adapter::new(engine).unwrap();
        // No document begun: the engine stays in object scope.
        let document = PdiDocument::open(&adapter, b"%PDF-1.4", OptionList::new()).unwrap();

        let page = document.page(1, OptionList::new()).unwrap();
        assert!(!probe.called("open_pdi_page"));
        assert!(!page.handle_ref().is_issued());
        assert!(matches!(page.info("width", OptionList::new()), Err(Error::Unissued(_))));

        // Closing the view never reaches the engine.
        page.close().unwrap();
        assert!(!probe.called("close_pdi_page"));
    }

    #[test]
    fn test_page_relative_introspection() {
        let engine = engine_with_template(2.0)
            .with_pcos_string("type:pages[1]/Rotate", "number")
            .with_pcos_number("pages[1]/Rotate", 90.0);
        let (adapter, _probe) = document_scope(engine);
        let document = PdiDocument::open(&adapter, b"%PDF-1.4", OptionList::new()).unwrap();

        let page = document.page(2, OptionList::new()).unwrap();
        let value = page.pcos("Rotate").unwrap();
        assert_eq!(value.as_number(), Some(90.0));
    }

    fn script_one_text_block(engine: FakeEngine) -> FakeEngine {
        let val = "pages[0]/blocks[0].val";
        engine
            .with_pcos_string("type:pages[0]/blocks", "dict")
            .with_pcos_number("length:pages[0]/blocks", 1.0)
            .with_pcos_string("pages[0]/blocks[0].key", "recipient")
            .with_pcos_string(&format!("type:{val}"), "dict")
            .with_pcos_number(&format!("length:{val}"), 3.0)
            .with_pcos_string(&format!("{val}[0].key"), "Name")
            .with_pcos_string(&format!("type:{val}[0].val"), "string")
            .with_pcos_string(&format!("{val}[0].val"), "recipient")
            .with_pcos_string(&format!("{val}[1].key"), "Subtype")
            .with_pcos_string(&format!("type:{val}[1].val"), "name")
            .with_pcos_string(&format!("{val}[1].val"), "Text")
            .with_pcos_string(&format!("{val}[2].key"), "Rect")
            .with_pcos_string(&format!("type:{val}[2].val"), "array")
            .with_pcos_number(&format!("length:{val}[2].val"), 4.0)
            .with_pcos_string(&format!("type:{val}[2].val[0]"), "number")
            .with_pcos_number(&format!("{val}[2].val[0]"), 10.0)
            .with_pcos_string(&format!("type:{val}[2].val[1]"), "number")
            .with_pcos_number(&format!("{val}[2].val[1]"), 700.0)
            .with_pcos_string(&format!("type:{val}[2].val[2]"), "number")
            .with_pcos_number(&format!("{val}[2].val[2]"), 300.0)
            .with_pcos_string(&format!("type:{val}[2].val[3]"), "number")
            .with_pcos_number(&format!("{val}[2].val[3]"), 740.0)
    }

    #[test]
    fn test_blocks_are_discovered_and_cached() {
        let engine = script_one_text_block(engine_with_template(1.0));
        let (adapter, probe) = document_scope(engine);
        let document = PdiDocument::open(&adapter, b"%PDF-1.4", OptionList::new()).unwrap();
        let page = document.page(1, OptionList::new()).unwrap();

        let blocks = page.blocks().unwrap();
        assert_eq!(blocks.len(), 1);
        let block = blocks.get("recipient").unwrap();
        assert_eq!(block.kind(), BlockKind::Text);
        assert_eq!(block.width(), 290.0);

        // A second lookup reuses the snapshot without re-reading.
        let reads = probe.count("pcos_get_string");
        let named = page.block("recipient").unwrap();
        assert!(named.is_some());
        assert_eq!(probe.count("pcos_get_string"), reads);
    }

    #[test]
    fn test_pages_without_blocks_read_as_empty() {
        let (adapter, _probe) = document_scope(engine_with_template(1.0));
        let document = PdiDocument::open(&adapter, b"%PDF-1.4", OptionList::new()).unwrap();
        let page = document.page(1, OptionList::new()).unwrap();

        assert!(page.blocks().unwrap().is_empty());
        assert!(page.block("anything").unwrap().is_none());
    }

    #[test]
    fn test_document_closes_exactly_once() {
        let (adapter, probe) = document_scope(engine_with_template(1.0));
        let document = PdiDocument::open(&adapter, b"%PDF-1.4", OptionList::new()).unwrap();

        document.close().unwrap();
        assert!(matches!(document.close(), Err(Error::Closed(_))));
        drop(document);
        assert_eq!(probe.count("close_pdi_document"), 1);
    }

    #[test]
    fn test_pages_iterator_visits_in_order() {
        let (adapter, _probe) = document_scope(engine_with_template(3.0));
        let document = PdiDocument::open(&adapter, b"%PDF-1.4", OptionList::new()).unwrap();

        let numbers: Vec<u32> = document
            .pages()
            .map(|page| page.unwrap().number())
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
