//! Template blocks declared on imported pages.
//!
//! Designers mark rectangular regions on a template PDF and tag each with
//! a name, a content kind, and optional custom properties. Discovery
//! snapshots those declarations once per page; filling routes content to
//! the engine's per-kind fill primitive, addressed by the imported page
//! handle and the block name.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::adapter::Adapter;
use crate::asset::{Graphics, Image};
use crate::error::{Error, Result};
use crate::handle::HandleRef;
use crate::options::OptionList;
use crate::pdi::pcos::PcosValue;
use crate::pdi::PdiPage;

/// The content kind a block accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Image,
    Graphics,
    Pdf,
}

impl BlockKind {
    /// Map a declared subtype to a kind; unknown subtypes are unsupported.
    fn from_subtype(subtype: &str) -> Option<Self> {
        match subtype {
            "Text" => Some(BlockKind::Text),
            "Image" => Some(BlockKind::Image),
            "Graphics" => Some(BlockKind::Graphics),
            "PDF" => Some(BlockKind::Pdf),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Image => "image",
            BlockKind::Graphics => "graphics",
            BlockKind::Pdf => "pdf",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content supplied to a block fill.
#[derive(Debug, Clone, Copy)]
pub enum BlockContent<'a> {
    Text(&'a str),
    Image(&'a Image),
    Graphics(&'a Graphics),
    PdfPage(&'a PdiPage),
}

impl BlockContent<'_> {
    fn kind(&self) -> BlockKind {
        match self {
            BlockContent::Text(_) => BlockKind::Text,
            BlockContent::Image(_) => BlockKind::Image,
            BlockContent::Graphics(_) => BlockKind::Graphics,
            BlockContent::PdfPage(_) => BlockKind::Pdf,
        }
    }
}

/// Lower-case the top-level property keys the way discovery expects.
pub(crate) fn lowercase_keys(
    properties: IndexMap<String, PcosValue>,
) -> IndexMap<String, PcosValue> {
    properties
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect()
}

/// One block declaration, snapshotted at discovery time.
#[derive(Debug)]
pub struct Block {
    adapter: Adapter,
    page: HandleRef,
    name: String,
    kind: BlockKind,
    rect: [f64; 4],
    properties: IndexMap<String, PcosValue>,
    custom: IndexMap<String, PcosValue>,
}

impl Block {
    /// Build a block from its lower-cased property snapshot.
    ///
    /// Returns `Ok(None)` for unsupported subtypes so discovery can skip
    /// them; missing required properties are an error. `key` is the name
    /// the page's block dictionary lists the declaration under.
    pub(crate) fn from_properties(
        adapter: &Adapter,
        page: &HandleRef,
        key: &str,
        properties: IndexMap<String, PcosValue>,
    ) -> Result<Option<Self>> {
        let name = properties
            .get("name")
            .and_then(PcosValue::as_str)
            .ok_or_else(|| Error::MissingBlockProperty(key.to_owned(), "name".to_owned()))?
            .to_owned();
        let subtype = properties
            .get("subtype")
            .and_then(PcosValue::as_str)
            .ok_or_else(|| Error::MissingBlockProperty(name.clone(), "subtype".to_owned()))?;

        let kind = match BlockKind::from_subtype(subtype) {
            Some(kind) => kind,
            None => {
                log::warn!("Skipping block '{name}' with unsupported subtype '{subtype}'");
                return Ok(None);
            }
        };

        let rect = Self::rect_from(&name, &properties)?;
        let custom = match properties.get("custom").and_then(PcosValue::as_dict) {
            Some(dict) => dict.to_map()?,
            None => IndexMap::new(),
        };

        Ok(Some(Self {
            adapter: adapter.clone(),
            page: page.clone(),
            name,
            kind,
            rect,
            properties,
            custom,
        }))
    }

    fn rect_from(name: &str, properties: &IndexMap<String, PcosValue>) -> Result<[f64; 4]> {
        let missing = || Error::MissingBlockProperty(name.to_owned(), "rect".to_owned());
        let values = properties
            .get("rect")
            .and_then(PcosValue::as_array)
            .ok_or_else(missing)?;
        if values.len() != 4 {
            return Err(missing());
        }
        let mut rect = [0.0; 4];
        for (slot, value) in rect.iter_mut().zip(values) {
            *slot = value.as_number().ok_or_else(missing)?;
        }
        Ok(rect)
    }

    /// The block name as declared on the template page.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The content kind this block accepts.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// The declared rectangle as `[x0, y0, x1, y1]` in page coordinates.
    pub fn rect(&self) -> [f64; 4] {
        self.rect
    }

    pub fn width(&self) -> f64 {
        self.rect[2] - self.rect[0]
    }

    pub fn height(&self) -> f64 {
        self.rect[3] - self.rect[1]
    }

    /// A declared property by lower-cased key.
    pub fn property(&self, key: &str) -> Option<&PcosValue> {
        self.properties.get(key)
    }

    /// Designer-defined custom properties, keys as declared.
    pub fn custom(&self) -> &IndexMap<String, PcosValue> {
        &self.custom
    }

    /// Fill the block with matching content.
    ///
    /// Text blocks default to the `embedding` option; call-site options
    /// win over defaults. Supplying content of the wrong kind is an
    /// error, as is filling before the imported page has an engine
    /// handle.
    pub fn fill(&self, content: BlockContent<'_>, options: OptionList) -> Result<()> {
        if content.kind() != self.kind {
            return Err(Error::BlockMismatch {
                name: self.name.clone(),
                actual: self.kind.to_string(),
                supplied: content.kind().to_string(),
            });
        }
        if !self.page.is_issued() {
            return Err(Error::Unissued("imported page"));
        }
        match content {
            BlockContent::Text(text) => {
                let defaults = OptionList::new().with_flag("embedding");
                self.adapter.fill_text_block(
                    &self.page,
                    &self.name,
                    text,
                    options.merge_over(&defaults),
                )
            }
            BlockContent::Image(image) => {
                self.adapter
                    .fill_image_block(&self.page, &self.name, image, options)
            }
            BlockContent::Graphics(graphics) => {
                self.adapter
                    .fill_graphics_block(&self.page, &self.name, graphics, options)
            }
            BlockContent::PdfPage(page) => {
                self.adapter
                    .fill_pdf_block(&self.page, &self.name, page, options)
            }
        }
    }
}

/// All supported blocks of one imported page, keyed by name in discovery
/// order.
#[derive(Debug, Default)]
pub struct BlockCollection {
    blocks: IndexMap<String, Block>,
}

impl BlockCollection {
    pub(crate) fn new(blocks: IndexMap<String, Block>) -> Self {
        Self { blocks }
    }

    /// Look up a block by name.
    pub fn get(&self, name: &str) -> Option<&Block> {
        self.blocks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block names in discovery order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Fill every block whose name appears in the source map.
    ///
    /// Blocks absent from the source are left alone; source entries with
    /// no matching block are ignored.
    pub fn fill_from(&self, source: &IndexMap<&str, BlockContent<'_>>) -> Result<()> {
        for block in self.iter() {
            if let Some(content) = source.get(block.name()) {
                block.fill(*content, OptionList::new())?;
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a BlockCollection {
    type Item = &'a Block;
    type IntoIter = indexmap::map::Values<'a, String, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.values()
    }
}
