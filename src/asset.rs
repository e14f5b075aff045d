//! Embeddable assets: fonts, raster images, vector graphics.
//!
//! Images and graphics load from in-memory bytes by spooling them through
//! the engine's virtual file system: register the bytes under a unique
//! `/pvf/...` path, run the loader against that path, then delete the
//! virtual file. The `copy` flag makes the engine take its own copy of the
//! buffer so the path can be removed immediately after loading.
//!
//! Handle lifetimes follow the engine's scope rules. Once the engine is
//! back in `object` scope it has reclaimed every document-bound handle, so
//! closing one there would fault; the drop guards check the scope and skip
//! the close in that case. Fonts have no close primitive at all.

use std::cell::Cell;

use uuid::Uuid;

use crate::adapter::Adapter;
use crate::engine::Scope;
use crate::error::{Error, Result};
use crate::handle::{HandleRef, Handleable};
use crate::options::OptionList;

/// Spool bytes through the virtual file system while `load` runs.
///
/// The virtual path is removed again whichever way the loader exits.
pub(crate) fn spooled<T>(
    adapter: &Adapter,
    contents: &[u8],
    load: impl FnOnce(&str) -> Result<T>,
) -> Result<T> {
    let path = format!("/pvf/{}", Uuid::new_v4());
    adapter.create_pvf(&path, contents, OptionList::new().with_flag("copy"))?;
    let loaded = load(&path);
    let deleted = adapter.delete_pvf(&path);
    let value = loaded?;
    deleted?;
    Ok(value)
}

/// Close an asset handle at most once, skipping when the engine already
/// reclaimed it.
pub(crate) fn guarded_close(
    adapter: &Adapter,
    released: &Cell<bool>,
    what: &'static str,
    close: impl FnOnce() -> Result<()>,
) -> Result<()> {
    if released.replace(true) {
        return Err(Error::Closed(what));
    }
    if adapter.is_scope(Scope::Object)? {
        log::debug!("Skipping {what} close in object scope");
        return Ok(());
    }
    close()
}

/// A font loaded by name through the engine's font machinery.
///
/// The engine keeps font handles until the document ends, so fonts are
/// freely cloneable and never closed.
#[derive(Debug, Clone)]
pub struct Font {
    adapter: Adapter,
    handle: HandleRef,
    name: String,
}

impl Font {
    pub(crate) fn load(
        adapter: &Adapter,
        name: &str,
        encoding: Option<&str>,
        options: OptionList,
    ) -> Result<Self> {
        let handle = adapter.load_font(name, encoding, options)?;
        Ok(Self {
            adapter: adapter.clone(),
            handle,
            name: name.to_owned(),
        })
    }

    /// The name the font was requested under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Query a font metric such as `capheight` or `ascender`.
    pub fn info(&self, key: &str, options: OptionList) -> Result<f64> {
        self.adapter.info_font(self, key, options)
    }
}

impl Handleable for Font {
    fn handle_ref(&self) -> &HandleRef {
        &self.handle
    }
}

/// A raster image loaded from in-memory bytes.
#[derive(Debug)]
pub struct Image {
    adapter: Adapter,
    handle: HandleRef,
    released: Cell<bool>,
}

impl Image {
    pub(crate) fn load(
        adapter: &Adapter,
        contents: &[u8],
        imagetype: Option<&str>,
        options: OptionList,
    ) -> Result<Self> {
        let handle = spooled(adapter, contents, |path| {
            adapter.load_image(path, imagetype, options)
        })?;
        Ok(Self {
            adapter: adapter.clone(),
            handle,
            released: Cell::new(false),
        })
    }

    /// Pixel width as reported by the engine.
    pub fn width(&self) -> Result<f64> {
        self.info("imagewidth", OptionList::new())
    }

    /// Pixel height as reported by the engine.
    pub fn height(&self) -> Result<f64> {
        self.info("imageheight", OptionList::new())
    }

    /// Query an image property.
    pub fn info(&self, key: &str, options: OptionList) -> Result<f64> {
        self.adapter.info_image(self, key, options)
    }

    /// Release the engine handle.
    pub fn close(&self) -> Result<()> {
        guarded_close(&self.adapter, &self.released, "image", || {
            self.adapter.close_image(self)
        })
    }
}

impl Handleable for Image {
    fn handle_ref(&self) -> &HandleRef {
        &self.handle
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        if self.released.get() {
            return;
        }
        if let Err(err) = self.close() {
            log::warn!("Failed to close image on drop: {err}");
        }
    }
}

/// A vector graphic (SVG) loaded from in-memory bytes.
#[derive(Debug)]
pub struct Graphics {
    adapter: Adapter,
    handle: HandleRef,
    released: Cell<bool>,
}

impl Graphics {
    pub(crate) fn load(
        adapter: &Adapter,
        contents: &[u8],
        graphicstype: Option<&str>,
        options: OptionList,
    ) -> Result<Self> {
        let handle = spooled(adapter, contents, |path| {
            adapter.load_graphics(path, graphicstype, options)
        })?;
        Ok(Self {
            adapter: adapter.clone(),
            handle,
            released: Cell::new(false),
        })
    }

    /// Natural width as reported by the engine.
    pub fn width(&self) -> Result<f64> {
        self.info("graphicswidth", OptionList::new())
    }

    /// Natural height as reported by the engine.
    pub fn height(&self) -> Result<f64> {
        self.info("graphicsheight", OptionList::new())
    }

    /// Query a graphics property.
    pub fn info(&self, key: &str, options: OptionList) -> Result<f64> {
        self.adapter.info_graphics(self, key, options)
    }

    /// Release the engine handle.
    pub fn close(&self) -> Result<()> {
        guarded_close(&self.adapter, &self.released, "graphics", || {
            self.adapter.close_graphics(self)
        })
    }
}

impl Handleable for Graphics {
    fn handle_ref(&self) -> &HandleRef {
        &self.handle
    }
}

impl Drop for Graphics {
    fn drop(&mut self) {
        if self.released.get() {
            return;
        }
        if let Err(err) = self.close() {
            log::warn!("Failed to close graphics on drop: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEngine;

    fn adapter_in_document() -> (Adapter, crate::testing::EngineProbe) {
        let engine = FakeEngine::new();
        let probe = engine.probe();
        let adapter = Adapter::new(engine).unwrap();
        adapter
            .begin_document(None, OptionList::new())
            .unwrap();
        (adapter, probe)
    }

    #[test]
    fn test_image_loads_through_virtual_file() {
        let (adapter, probe) = adapter_in_document();
        let image = Image::load(&adapter, b"\x89PNG fake", None, OptionList::new()).unwrap();

        assert!(image.handle() > 0);
        assert!(probe.called("create_pvf /pvf/"));
        assert!(probe.called("load_image auto /pvf/"));
        // The virtual file is gone once the loader returns.
        assert!(probe.pvf_paths().is_empty());
    }

    #[test]
    fn test_spool_deletes_path_when_loader_fails() {
        let engine = FakeEngine::new().with_api_error("load_image", 1302, "corrupt image data");
        let probe = engine.probe();
        let adapter = Adapter::new(engine).unwrap();
        adapter.begin_document(None, OptionList::new()).unwrap();

        let err = Image::load(&adapter, b"not an image", None, OptionList::new()).unwrap_err();
        assert!(err.to_string().contains("corrupt image data"));
        assert!(probe.pvf_paths().is_empty());
    }

    #[test]
    fn test_image_close_skipped_in_object_scope() {
        let (adapter, probe) = adapter_in_document();
        let image = Image::load(&adapter, b"bytes", None, OptionList::new()).unwrap();
        adapter.end_document(OptionList::new()).unwrap();

        // The engine reclaimed the handle when the document ended.
        drop(image);
        assert!(!probe.called("close_image"));
    }

    #[test]
    fn test_image_closes_once() {
        let (adapter, probe) = adapter_in_document();
        let image = Image::load(&adapter, b"bytes", None, OptionList::new()).unwrap();

        image.close().unwrap();
        assert!(matches!(image.close(), Err(Error::Closed("image"))));
        drop(image);
        assert_eq!(probe.count("close_image"), 1);
    }

    #[test]
    fn test_graphics_load_and_drop_close() {
        let (adapter, probe) = adapter_in_document();
        let graphics =
            Graphics::load(&adapter, b"<svg/>", None, OptionList::new()).unwrap();
        assert!(probe.called("load_graphics auto /pvf/"));

        drop(graphics);
        assert_eq!(probe.count("close_graphics"), 1);
    }

    #[test]
    fn test_font_reports_metrics() {
        let engine = FakeEngine::new().with_info("capheight", 0.7);
        let probe = engine.probe();
        let adapter = Adapter::new(engine).unwrap();
        adapter.begin_document(None, OptionList::new()).unwrap();

        let font = Font::load(&adapter, "Helvetica", None, OptionList::new()).unwrap();
        assert_eq!(font.name(), "Helvetica");
        assert_eq!(font.info("capheight", OptionList::new()).unwrap(), 0.7);
        assert!(probe.called("load_font Helvetica unicode"));

        // Fonts are engine-owned; dropping one never issues a close.
        drop(font);
        assert!(!probe.called("close"));
    }
}
