//! Integration tests for document import, introspection, and block fill.

use enpdf::builder::PdfBuilder;
use enpdf::testing::{EngineProbe, FakeEngine};
use enpdf::{BlockContent, Error, OptionList};
use serde_json::json;

const A4_WIDTH: f64 = 595.0;
const A4_HEIGHT: f64 = 842.0;

/// Script a one-page template whose first page declares a single text
/// block named `recipient` at (10, 700)-(300, 740).
fn letterhead_engine() -> FakeEngine {
    let val = "pages[0]/blocks[0].val";
    FakeEngine::new()
        .with_pcos_number("length:pages", 1.0)
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

fn builder_on(engine: FakeEngine) -> (PdfBuilder, EngineProbe) {
    let probe = engine.probe();
    let pdf = PdfBuilder::new(engine).unwrap();
    (pdf, probe)
}

#[test]
fn test_letterhead_fill_end_to_end() {
    let (mut pdf, probe) = builder_on(letterhead_engine());

    let template = pdf.import(b"%PDF-1.6 letterhead", OptionList::new()).unwrap();
    assert_eq!(template.page_count(), 1);

    pdf.add_page(A4_WIDTH, A4_HEIGHT, OptionList::new()).unwrap();
    let background = template.page(1, OptionList::new()).unwrap();
    pdf.place_page(&background, 0.0, 0.0, OptionList::new()).unwrap();

    let block = background.block("recipient").unwrap().unwrap();
    assert_eq!(block.rect(), [10.0, 700.0, 300.0, 740.0]);
    block
        .fill(BlockContent::Text("ACME GmbH"), OptionList::new())
        .unwrap();

    let bytes = pdf.render().unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    // Document handle 1, page handle 2; text fill embeds fonts by default.
    assert!(probe.called("fit_pdi_page 2 0 0"));
    assert!(probe.called("fill_textblock 2 recipient ACME GmbH embedding"));
}

#[test]
fn test_template_repeats_across_pages() {
    let engine = FakeEngine::new().with_pcos_number("length:pages", 1.0);
    let (mut pdf, probe) = builder_on(engine);

    let template = pdf.import(b"%PDF-1.6", OptionList::new()).unwrap();

    for _ in 0..2 {
        pdf.add_page(A4_WIDTH, A4_HEIGHT, OptionList::new()).unwrap();
        let stationery = template.page(1, OptionList::new()).unwrap();
        pdf.place_page(&stationery, 0.0, 0.0, OptionList::new()).unwrap();
    }

    // The page handle is cached, so it opens once and is placed twice.
    assert_eq!(probe.count("open_pdi_page"), 1);
    assert_eq!(probe.count("fit_pdi_page"), 2);
}

#[test]
fn test_document_and_page_introspection() {
    let engine = FakeEngine::new()
        .with_pcos_number("length:pages", 2.0)
        .with_pcos_string("type:Info/Author", "string")
        .with_pcos_string("Info/Author", "Ada Lovelace")
        .with_pcos_string("type:pages[0]/width", "number")
        .with_pcos_number("pages[0]/width", 595.0)
        .with_info("width", 595.0);
    let (mut pdf, _probe) = builder_on(engine);

    let document = pdf.import(b"%PDF-1.7", OptionList::new()).unwrap();
    let author = document.pcos("Info/Author").unwrap();
    assert_eq!(author.as_str(), Some("Ada Lovelace"));
    assert!(document.pcos("Info/Keywords").unwrap().is_null());

    pdf.add_page(A4_WIDTH, A4_HEIGHT, OptionList::new()).unwrap();
    let page = document.page(1, OptionList::new()).unwrap();
    // Geometry is available both through the page handle and pcos.
    assert_eq!(page.width().unwrap(), 595.0);
    assert_eq!(page.pcos("width").unwrap().as_number(), Some(595.0));
}

#[test]
fn test_pcos_json_export() {
    let engine = FakeEngine::new()
        .with_pcos_number("length:pages", 1.0)
        .with_pcos_string("type:Info", "dict")
        .with_pcos_number("length:Info", 2.0)
        .with_pcos_string("Info[0].key", "Author")
        .with_pcos_string("type:Info[0].val", "string")
        .with_pcos_string("Info[0].val", "Ada Lovelace")
        .with_pcos_string("Info[1].key", "Trapped")
        .with_pcos_string("type:Info[1].val", "boolean")
        .with_pcos_number("Info[1].val", 0.0);
    let (pdf, _probe) = builder_on(engine);

    let document = pdf.import(b"%PDF-1.7", OptionList::new()).unwrap();
    let info = document.pcos_json("Info").unwrap();
    assert_eq!(info, json!({ "Author": "Ada Lovelace", "Trapped": false }));
}

#[test]
fn test_saved_document_only_serves_metadata() {
    let (mut pdf, probe) = builder_on(letterhead_engine());
    pdf.add_page(A4_WIDTH, A4_HEIGHT, OptionList::new()).unwrap();
    pdf.save().unwrap();

    // Import still works after save, but pages stay metadata-only.
    let template = pdf.import(b"%PDF-1.6 letterhead", OptionList::new()).unwrap();
    let page = template.page(1, OptionList::new()).unwrap();
    assert!(!probe.called("open_pdi_page"));

    let block = page.block("recipient").unwrap().unwrap();
    assert_eq!(block.width(), 290.0);

    let err = pdf
        .place_page(&page, 0.0, 0.0, OptionList::new())
        .unwrap_err();
    assert!(matches!(err, Error::Unissued("imported page")));
    let err = block
        .fill(BlockContent::Text("too late"), OptionList::new())
        .unwrap_err();
    assert!(matches!(err, Error::Unissued("imported page")));
    let err = page.width().unwrap_err();
    assert!(matches!(err, Error::Unissued("imported page")));
}

#[test]
fn test_import_rejects_out_of_range_pages() {
    let engine = FakeEngine::new().with_pcos_number("length:pages", 2.0);
    let (pdf, _probe) = builder_on(engine);

    let document = pdf.import(b"%PDF-1.7", OptionList::new()).unwrap();
    let err = document.page(3, OptionList::new()).unwrap_err();
    assert!(matches!(err, Error::PageOutOfRange(3, 2)));
    assert!(document.page(0, OptionList::new()).is_err());
}

#[test]
fn test_document_closes_once() {
    let engine = FakeEngine::new().with_pcos_number("length:pages", 1.0);
    let (pdf, probe) = builder_on(engine);

    let document = pdf.import(b"%PDF-1.7", OptionList::new()).unwrap();
    document.close().unwrap();
    let err = document.close().unwrap_err();
    assert!(matches!(err, Error::Closed("imported document")));

    drop(document);
    assert_eq!(probe.count("close_pdi_document"), 1);
}
