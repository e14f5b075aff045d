//! # enpdf
//!
//! Typed driver for PDFlib-style document engines.
//!
//! This library wraps an engine's flat, handle-based C API in a
//! structured object model: documents, pages, fonts, images, tables,
//! text flows, and imported PDFs become owned values whose lifetimes
//! and option lists are managed for you.
//!
//! ## Quick Start
//!
//! ```
//! use enpdf::{OptionList, PdfBuilder};
//! use enpdf::testing::FakeEngine;
//!
//! fn main() -> enpdf::Result<()> {
//!     // Swap in a binding to a real engine in production.
//!     let mut pdf = PdfBuilder::new(FakeEngine::new())?;
//!     let font = pdf.load_font("Helvetica", None, OptionList::new())?;
//!
//!     pdf.add_page(595.0, 842.0, OptionList::new())?;
//!     let heading = pdf.new_textflow(&font, 24.0, "Quarterly Report", OptionList::new())?;
//!     pdf.place_textflow(&heading, 40.0, 40.0, 515.0, 60.0, OptionList::new())?;
//!
//!     let bytes = pdf.render()?;
//!     assert!(bytes.starts_with(b"%PDF"));
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Typed handles**: fonts, images, tables, and text flows are owned
//!   values; raw engine integers never surface
//! - **Page suspension**: any page can be revisited until the document
//!   is saved
//! - **Structured options**: a builder for the engine's `key=value`
//!   option-list syntax, with merge and override rules
//! - **Document import**: open existing PDFs, place their pages, fill
//!   named form blocks
//! - **Introspection**: typed path queries over an imported document's
//!   object tree, with JSON export
//! - **Engine-free tests**: a scripted in-memory engine drives the
//!   whole API without a native library

pub mod adapter;
pub mod asset;
pub mod builder;
pub mod color;
pub mod draw;
pub mod engine;
pub mod error;
pub mod handle;
pub mod options;
pub mod page;
pub mod pdi;
pub mod table;
pub mod testing;
pub mod textflow;

// Re-export commonly used types
pub use adapter::Adapter;
pub use asset::{Font, Graphics, Image};
pub use builder::PdfBuilder;
pub use color::{Color, PaintMode, SpotColor};
pub use draw::{Drawing, GraphicsState, Layer, LayerDependency, Shading, ShadingKind};
pub use engine::{Engine, EngineError, EngineResult, Scope};
pub use error::{Error, Result};
pub use handle::{HandleKind, HandleRef, Handleable, RawHandle};
pub use options::{OptionList, OptionValue};
pub use pdi::{Block, BlockCollection, BlockContent, BlockKind, PcosValue, PdiDocument, PdiPage};
pub use table::Table;
pub use textflow::Textflow;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEngine;

    #[test]
    fn test_builder_flow_through_root_exports() {
        let mut pdf = PdfBuilder::new(FakeEngine::new()).unwrap();
        pdf.add_page(595.0, 842.0, OptionList::new()).unwrap();
        let bytes = pdf.render().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_option_list_encoding() {
        let options = OptionList::new()
            .with("fontsize", 12.0)
            .with_flag("embedding")
            .with("fillcolor", Color::gray(0.5));
        assert_eq!(options.encode(), "fontsize=12 embedding fillcolor={gray 0.5}");
    }

    #[test]
    fn test_engine_error_converts() {
        let err = Error::from(EngineError::new(1202, "get_option", "unknown option"));
        assert!(matches!(err, Error::Engine(_)));
    }

    #[test]
    fn test_scope_round_trip() {
        assert_eq!(Scope::from_name("page"), Some(Scope::Page));
        assert_eq!(Scope::Page.as_str(), "page");
    }
}
