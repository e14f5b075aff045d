//! Engine resource handles.
//!
//! The engine identifies every loaded resource (font, image, imported page,
//! table, ...) by a small integer. Wrappers in this crate own exactly one
//! handle each and share it through a [`HandleRef`] cell so that option
//! lists resolve the raw value at encoding time, never earlier: some
//! handles (tables, textflows) are reissued by the engine as content is
//! added.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Raw engine handle value.
pub type RawHandle = i32;

/// Sentinel for a handle the engine has not issued (yet, or anymore).
///
/// Matches the engine convention where `-1` starts a fresh table/textflow
/// and marks invalid results.
pub const NO_HANDLE: RawHandle = -1;

/// The resource kind a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    Font,
    Image,
    Graphics,
    Table,
    Textflow,
    /// An imported (PDI) document.
    Document,
    /// A single imported (PDI) page.
    Page,
    Shading,
    Layer,
    GraphicsState,
    SpotColor,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleKind::Font => "font",
            HandleKind::Image => "image",
            HandleKind::Graphics => "graphics",
            HandleKind::Table => "table",
            HandleKind::Textflow => "textflow",
            HandleKind::Document => "document",
            HandleKind::Page => "page",
            HandleKind::Shading => "shading",
            HandleKind::Layer => "layer",
            HandleKind::GraphicsState => "gstate",
            HandleKind::SpotColor => "spotcolor",
        };
        f.write_str(name)
    }
}

/// A shared, late-bound reference to one engine handle.
///
/// Cloning is cheap and refers to the same underlying slot. Reading through
/// a clone always observes the current raw value, so a reference embedded
/// in an [`OptionList`](crate::options::OptionList) stays correct even when
/// the owning wrapper's handle is reissued later.
#[derive(Clone)]
pub struct HandleRef {
    kind: HandleKind,
    raw: Rc<Cell<RawHandle>>,
}

impl HandleRef {
    /// Create a reference holding an already-issued handle.
    pub fn new(kind: HandleKind, raw: RawHandle) -> Self {
        Self {
            kind,
            raw: Rc::new(Cell::new(raw)),
        }
    }

    /// Create a reference in the not-yet-issued state ([`NO_HANDLE`]).
    pub fn unissued(kind: HandleKind) -> Self {
        Self::new(kind, NO_HANDLE)
    }

    /// The resource kind this handle refers to.
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Current raw value; [`NO_HANDLE`] when not issued.
    pub fn get(&self) -> RawHandle {
        self.raw.get()
    }

    /// Replace the raw value (the engine reissued the handle).
    pub fn set(&self, raw: RawHandle) {
        self.raw.set(raw);
    }

    /// Whether the engine has issued a value for this handle.
    pub fn is_issued(&self) -> bool {
        self.raw.get() != NO_HANDLE
    }
}

impl fmt::Debug for HandleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandleRef({} {})", self.kind, self.raw.get())
    }
}

impl PartialEq for HandleRef {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.raw.get() == other.raw.get()
    }
}

/// Implemented by every wrapper that owns an engine handle.
///
/// Session methods take `impl Handleable` arguments and resolve them to the
/// raw integer at call time.
pub trait Handleable {
    /// The shared handle slot of this resource.
    fn handle_ref(&self) -> &HandleRef;

    /// Current raw handle value.
    fn handle(&self) -> RawHandle {
        self.handle_ref().get()
    }
}

impl Handleable for HandleRef {
    fn handle_ref(&self) -> &HandleRef {
        self
    }
}

impl<T: Handleable + ?Sized> Handleable for &T {
    fn handle_ref(&self) -> &HandleRef {
        (**self).handle_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_ref_shares_raw_value() {
        let a = HandleRef::unissued(HandleKind::Table);
        let b = a.clone();
        assert!(!b.is_issued());

        a.set(7);
        assert_eq!(b.get(), 7);
        assert!(b.is_issued());
    }

    #[test]
    fn test_handle_kind_display() {
        assert_eq!(HandleKind::GraphicsState.to_string(), "gstate");
        assert_eq!(HandleKind::Document.to_string(), "document");
    }

    #[test]
    fn test_handleable_through_reference() {
        let h = HandleRef::new(HandleKind::Font, 3);
        fn raw_of(h: impl Handleable) -> RawHandle {
            h.handle()
        }
        assert_eq!(raw_of(&h), 3);
    }
}
