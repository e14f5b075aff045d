//! Path-addressed introspection of imported documents.
//!
//! Every object in an imported PDF is reachable through a slash-and-index
//! path such as `pages[0]/annots[2]/rect`. Two pseudo prefixes answer
//! questions about a path instead of reading it: `type:` names the object
//! type (`null` for absent paths) and `length:` counts container entries
//! (zero for anything else). Dictionary entries can also be walked
//! positionally via the synthetic `path[i].key` / `path[i].val` paths.
//!
//! Scalars and arrays materialize eagerly; dictionaries stay lazy behind
//! [`PcosDict`] so deep trees cost nothing until they are walked.

use indexmap::IndexMap;

use crate::adapter::Adapter;
use crate::error::Result;
use crate::handle::HandleRef;
use crate::options::OptionList;

/// A value read from the introspection tree.
#[derive(Debug, Clone)]
pub enum PcosValue {
    /// The path does not exist.
    Null,
    Bool(bool),
    Number(f64),
    /// A `name` or `string` leaf.
    Text(String),
    /// Eagerly materialized array elements.
    Array(Vec<PcosValue>),
    /// A dictionary, resolved entry by entry on access.
    Dict(PcosDict),
    /// Raw contents of a content or file stream.
    Stream(Vec<u8>),
}

impl PcosValue {
    /// Whether the path was absent.
    pub fn is_null(&self) -> bool {
        matches!(self, PcosValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PcosValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PcosValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PcosValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PcosValue]> {
        match self {
            PcosValue::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&PcosDict> {
        match self {
            PcosValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PcosValue::Stream(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Materialize into JSON, resolving nested dictionaries on demand.
    ///
    /// Stream bytes become lossy UTF-8 strings; non-finite numbers become
    /// JSON null.
    pub fn into_json(self) -> Result<serde_json::Value> {
        use serde_json::Value;

        Ok(match self {
            PcosValue::Null => Value::Null,
            PcosValue::Bool(value) => Value::Bool(value),
            PcosValue::Number(value) => serde_json::Number::from_f64(value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PcosValue::Text(value) => Value::String(value),
            PcosValue::Array(values) => Value::Array(
                values
                    .into_iter()
                    .map(PcosValue::into_json)
                    .collect::<Result<_>>()?,
            ),
            PcosValue::Dict(dict) => {
                let mut object = serde_json::Map::new();
                for entry in dict.entries() {
                    let (key, value) = entry?;
                    object.insert(key, value.into_json()?);
                }
                Value::Object(object)
            }
            PcosValue::Stream(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        })
    }
}

/// Introspection accessor bound to one open imported document.
#[derive(Debug, Clone)]
pub struct Pcos {
    adapter: Adapter,
    document: HandleRef,
}

impl Pcos {
    pub(crate) fn new(adapter: &Adapter, document: &HandleRef) -> Self {
        Self {
            adapter: adapter.clone(),
            document: document.clone(),
        }
    }

    /// The object type name at a path, `"null"` when absent.
    pub fn type_of(&self, path: &str) -> Result<String> {
        self.get_string(&format!("type:{path}"))
    }

    /// Whether a path resolves to anything.
    pub fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.type_of(path)? != "null")
    }

    /// Number of entries at a container path, zero elsewhere.
    pub fn length(&self, path: &str) -> Result<u32> {
        Ok(self.get_number(&format!("length:{path}"))? as u32)
    }

    /// Read a numeric or boolean object.
    pub fn get_number(&self, path: &str) -> Result<f64> {
        self.adapter.pcos_get_number(&self.document, path)
    }

    /// Read a name or string object.
    pub fn get_string(&self, path: &str) -> Result<String> {
        self.adapter.pcos_get_string(&self.document, path)
    }

    /// Read raw stream contents.
    pub fn get_stream(&self, path: &str, options: OptionList) -> Result<Vec<u8>> {
        self.adapter.pcos_get_stream(&self.document, path, options)
    }

    /// Read and materialize the value at a path.
    ///
    /// The type probe decides the representation; absent and unrecognized
    /// types read as [`PcosValue::Null`] rather than an error.
    pub fn get(&self, path: &str) -> Result<PcosValue> {
        let kind = self.type_of(path)?;
        match kind.as_str() {
            "boolean" => Ok(PcosValue::Bool(self.get_number(path)? != 0.0)),
            "number" => Ok(PcosValue::Number(self.get_number(path)?)),
            "name" | "string" => Ok(PcosValue::Text(self.get_string(path)?)),
            "array" => {
                let length = self.length(path)?;
                let mut values = Vec::with_capacity(length as usize);
                for index in 0..length {
                    values.push(self.get(&format!("{path}[{index}]"))?);
                }
                Ok(PcosValue::Array(values))
            }
            "dict" => Ok(PcosValue::Dict(PcosDict::new(self.clone(), path))),
            "stream" | "fstream" => {
                Ok(PcosValue::Stream(self.get_stream(path, OptionList::new())?))
            }
            _ => Ok(PcosValue::Null),
        }
    }

    /// The whole subtree at a path as JSON.
    pub fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        self.get(path)?.into_json()
    }
}

/// A dictionary in the introspection tree.
///
/// Entries resolve against the engine on access; there is no mutation
/// surface because the imported document cannot change while open.
#[derive(Debug, Clone)]
pub struct PcosDict {
    pcos: Pcos,
    path: String,
}

impl PcosDict {
    pub(crate) fn new(pcos: Pcos, path: &str) -> Self {
        Self {
            pcos,
            path: path.to_owned(),
        }
    }

    /// The dictionary's own path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of entries, re-read from the engine.
    pub fn len(&self) -> Result<u32> {
        self.pcos.length(&self.path)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether a key resolves to anything.
    pub fn contains(&self, key: &str) -> Result<bool> {
        self.pcos.exists(&format!("{}/{key}", self.path))
    }

    /// The value under a key, [`PcosValue::Null`] when absent.
    pub fn get(&self, key: &str) -> Result<PcosValue> {
        self.pcos.get(&format!("{}/{key}", self.path))
    }

    /// The value at a position.
    pub fn at(&self, index: u32) -> Result<PcosValue> {
        self.pcos.get(&format!("{}[{index}]", self.path))
    }

    /// The key at a position.
    pub fn key_at(&self, index: u32) -> Result<String> {
        self.pcos.get_string(&format!("{}[{index}].key", self.path))
    }

    /// Iterate `(key, value)` pairs in dictionary order.
    ///
    /// Each call starts from the first entry.
    pub fn entries(&self) -> PcosEntries<'_> {
        PcosEntries {
            dict: self,
            index: 0,
        }
    }

    /// One-level snapshot into an ordered map.
    pub fn to_map(&self) -> Result<IndexMap<String, PcosValue>> {
        let mut map = IndexMap::new();
        for entry in self.entries() {
            let (key, value) = entry?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

/// Positional iterator over dictionary entries.
pub struct PcosEntries<'a> {
    dict: &'a PcosDict,
    index: u32,
}

impl Iterator for PcosEntries<'_> {
    type Item = Result<(String, PcosValue)>;

    fn next(&mut self) -> Option<Self::Item> {
        let length = match self.dict.len() {
            Ok(length) => length,
            Err(err) => return Some(Err(err)),
        };
        if self.index >= length {
            return None;
        }
        let index = self.index;
        self.index += 1;

        let path = self.dict.path();
        let key = self.dict.pcos.get_string(&format!("{path}[{index}].key"));
        let value = self.dict.pcos.get(&format!("{path}[{index}].val"));
        match (key, value) {
            (Ok(key), Ok(value)) => Some(Ok((key, value))),
            (Err(err), _) | (_, Err(err)) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEngine;

    fn document_fixture(engine: FakeEngine) -> Pcos {
        let adapter = Adapter::new(engine).unwrap();
        let document = adapter
            .open_pdi_document("template.pdf", OptionList::new())
            .unwrap();
        Pcos::new(&adapter, &document)
    }

    #[test]
    fn test_absent_path_reads_as_null() {
        let pcos = document_fixture(FakeEngine::new());
        let value = pcos.get("nowhere/at/all").unwrap();
        assert!(value.is_null());
        assert!(!pcos.exists("nowhere/at/all").unwrap());
    }

    #[test]
    fn test_length_is_zero_for_non_containers() {
        let engine = FakeEngine::new()
            .with_pcos_string("type:author", "string")
            .with_pcos_string("author", "Jane");
        let pcos = document_fixture(engine);
        assert_eq!(pcos.length("author").unwrap(), 0);
    }

    #[test]
    fn test_scalar_types_materialize() {
        let engine = FakeEngine::new()
            .with_pcos_string("type:encrypt/paddle", "boolean")
            .with_pcos_number("encrypt/paddle", 1.0)
            .with_pcos_string("type:pages[0]/width", "number")
            .with_pcos_number("pages[0]/width", 595.0)
            .with_pcos_string("type:info/Title", "string")
            .with_pcos_string("info/Title", "Invoice");
        let pcos = document_fixture(engine);

        assert_eq!(pcos.get("encrypt/paddle").unwrap().as_bool(), Some(true));
        assert_eq!(
            pcos.get("pages[0]/width").unwrap().as_number(),
            Some(595.0)
        );
        assert_eq!(pcos.get("info/Title").unwrap().as_str(), Some("Invoice"));
    }

    #[test]
    fn test_arrays_materialize_eagerly() {
        let engine = FakeEngine::new()
            .with_pcos_string("type:pages[0]/mediabox", "array")
            .with_pcos_number("length:pages[0]/mediabox", 4.0)
            .with_pcos_string("type:pages[0]/mediabox[0]", "number")
            .with_pcos_number("pages[0]/mediabox[0]", 0.0)
            .with_pcos_string("type:pages[0]/mediabox[1]", "number")
            .with_pcos_number("pages[0]/mediabox[1]", 0.0)
            .with_pcos_string("type:pages[0]/mediabox[2]", "number")
            .with_pcos_number("pages[0]/mediabox[2]", 595.0)
            .with_pcos_string("type:pages[0]/mediabox[3]", "number")
            .with_pcos_number("pages[0]/mediabox[3]", 842.0);
        let pcos = document_fixture(engine);

        let value = pcos.get("pages[0]/mediabox").unwrap();
        let numbers: Vec<f64> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_number().unwrap())
            .collect();
        assert_eq!(numbers, vec![0.0, 0.0, 595.0, 842.0]);
    }

    #[test]
    fn test_dicts_stay_lazy_until_walked() {
        let engine = FakeEngine::new()
            .with_pcos_string("type:info", "dict")
            .with_pcos_number("length:info", 2.0)
            .with_pcos_string("info[0].key", "Title")
            .with_pcos_string("type:info[0].val", "string")
            .with_pcos_string("info[0].val", "Invoice")
            .with_pcos_string("info[1].key", "Pages")
            .with_pcos_string("type:info[1].val", "number")
            .with_pcos_number("info[1].val", 3.0)
            .with_pcos_string("type:info/Title", "string")
            .with_pcos_string("info/Title", "Invoice");
        let pcos = document_fixture(engine);

        let value = pcos.get("info").unwrap();
        let dict = value.as_dict().unwrap();
        assert_eq!(dict.len().unwrap(), 2);
        assert!(dict.contains("Title").unwrap());
        assert_eq!(dict.get("Title").unwrap().as_str(), Some("Invoice"));

        let map = dict.to_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["Title"].as_str(), Some("Invoice"));
        assert_eq!(map["Pages"].as_number(), Some(3.0));

        // Iteration restarts from the top on every call.
        assert_eq!(dict.entries().count(), 2);
        assert_eq!(dict.entries().count(), 2);
    }

    #[test]
    fn test_streams_read_raw_bytes() {
        let engine = FakeEngine::new()
            .with_pcos_string("type:pages[0]/contents", "stream")
            .with_pcos_stream("pages[0]/contents", b"BT /F1 12 Tf ET");
        let pcos = document_fixture(engine);

        let value = pcos.get("pages[0]/contents").unwrap();
        assert_eq!(value.as_bytes(), Some(&b"BT /F1 12 Tf ET"[..]));
    }

    #[test]
    fn test_json_export_materializes_nested_dicts() {
        let engine = FakeEngine::new()
            .with_pcos_string("type:info", "dict")
            .with_pcos_number("length:info", 1.0)
            .with_pcos_string("info[0].key", "Title")
            .with_pcos_string("type:info[0].val", "string")
            .with_pcos_string("info[0].val", "Invoice");
        let pcos = document_fixture(engine);

        let json = pcos.get_json("info").unwrap();
        assert_eq!(json, serde_json::json!({ "Title": "Invoice" }));
    }
}
