//! Item model: normalized write/delete descriptors
//!
//! Items are built once per request and never mutated after they enter a
//! [`Batch`](super::Batch). Identity across retry rounds is the pair
//! (collection, key) plus the operation kind, so every type here is `Eq + Hash`.

use crate::utils::error::{BatchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Attribute name → value mapping with a deterministic iteration order
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// A single attribute value in the store's wire vocabulary
///
/// Numbers are carried as their decimal string form, the way the store
/// transmits them, which keeps the type `Eq + Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String
    S(String),
    /// Number (decimal string)
    N(String),
    /// Binary
    B(Vec<u8>),
    /// Boolean
    #[serde(rename = "BOOL")]
    Bool(bool),
    /// Explicit null
    #[serde(rename = "NULL")]
    Null,
    /// List
    L(Vec<AttributeValue>),
    /// Nested map
    M(AttributeMap),
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self::S(value.into())
    }

    pub fn number(value: impl fmt::Display) -> Self {
        Self::N(value.to_string())
    }

    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            Self::N(n) => Some(n),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S(s) => write!(f, "{s}"),
            Self::N(n) => write!(f, "{n}"),
            Self::B(b) => write!(f, "<{} bytes>", b.len()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => write!(f, "null"),
            Self::L(l) => write!(f, "<list of {}>", l.len()),
            Self::M(m) => write!(f, "<map of {}>", m.len()),
        }
    }
}

/// Primary key of an item: hash key plus optional range key
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(AttributeMap);

impl ItemKey {
    /// Key made of a single hash attribute
    pub fn hash(name: impl Into<String>, value: AttributeValue) -> Self {
        let mut attrs = AttributeMap::new();
        attrs.insert(name.into(), value);
        Self(attrs)
    }

    /// Add a range attribute to the key
    pub fn with_range(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn from_attributes(attrs: AttributeMap) -> Self {
        Self(attrs)
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.0
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_attributes(self) -> AttributeMap {
        self.0
    }

    fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(BatchError::validation("item key has no attributes"));
        }
        for (name, value) in &self.0 {
            if name.is_empty() {
                return Err(BatchError::validation("key attribute name is empty"));
            }
            if !matches!(
                value,
                AttributeValue::S(_) | AttributeValue::N(_) | AttributeValue::B(_)
            ) {
                return Err(BatchError::validation(format!(
                    "key attribute '{name}' must be a string, number or binary"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{name}={value}")?;
            first = false;
        }
        Ok(())
    }
}

fn validate_collection(collection: &str) -> Result<()> {
    if collection.trim().is_empty() {
        return Err(BatchError::validation("collection name is empty"));
    }
    Ok(())
}

/// Upsert of one item into a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WriteItem {
    collection: String,
    key: ItemKey,
    attributes: AttributeMap,
}

impl WriteItem {
    pub fn new(collection: impl Into<String>, key: ItemKey, attributes: AttributeMap) -> Self {
        Self {
            collection: collection.into(),
            key,
            attributes,
        }
    }

    /// Creation with a client-assigned v4 UUID as its hash key
    pub fn with_generated_id(
        collection: impl Into<String>,
        id_attribute: impl Into<String>,
        attributes: AttributeMap,
    ) -> Self {
        let key = ItemKey::hash(
            id_attribute,
            AttributeValue::string(Uuid::new_v4().to_string()),
        );
        Self::new(collection, key, attributes)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Full stored representation: key attributes merged with the payload
    pub fn to_record(&self) -> AttributeMap {
        let mut record = self.attributes.clone();
        for (name, value) in self.key.attributes() {
            record.insert(name.clone(), value.clone());
        }
        record
    }

    pub fn validate(&self) -> Result<()> {
        validate_collection(&self.collection)?;
        self.key.validate()?;
        for (name, value) in &self.attributes {
            if name.is_empty() {
                return Err(BatchError::validation(format!(
                    "item {} in '{}' has an empty attribute name",
                    self.key, self.collection
                )));
            }
            if let Some(key_value) = self.key.get(name) {
                if key_value != value {
                    return Err(BatchError::validation(format!(
                        "attribute '{name}' conflicts with the key of item {} in '{}'",
                        self.key, self.collection
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Removal of one item, addressed by key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeleteItem {
    collection: String,
    key: ItemKey,
}

impl DeleteItem {
    pub fn new(collection: impl Into<String>, key: ItemKey) -> Self {
        Self {
            collection: collection.into(),
            key,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    pub fn validate(&self) -> Result<()> {
        validate_collection(&self.collection)?;
        self.key.validate()
    }
}

/// Address of an item to read
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemRef {
    pub collection: String,
    pub key: ItemKey,
}

impl ItemRef {
    pub fn new(collection: impl Into<String>, key: ItemKey) -> Self {
        Self {
            collection: collection.into(),
            key,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_collection(&self.collection)?;
        self.key.validate()
    }
}

impl From<DeleteItem> for ItemRef {
    fn from(item: DeleteItem) -> Self {
        Self {
            collection: item.collection,
            key: item.key,
        }
    }
}

/// Kind of a write operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Put,
    Delete,
}

/// One entry of a batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum WriteOp {
    Put(WriteItem),
    Delete(DeleteItem),
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            Self::Put(item) => item.collection(),
            Self::Delete(item) => item.collection(),
        }
    }

    pub fn key(&self) -> &ItemKey {
        match self {
            Self::Put(item) => item.key(),
            Self::Delete(item) => item.key(),
        }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Self::Put(_) => OpKind::Put,
            Self::Delete(_) => OpKind::Delete,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Put(item) => item.validate(),
            Self::Delete(item) => item.validate(),
        }
    }
}

impl From<WriteItem> for WriteOp {
    fn from(item: WriteItem) -> Self {
        Self::Put(item)
    }
}

impl From<DeleteItem> for WriteOp {
    fn from(item: DeleteItem) -> Self {
        Self::Delete(item)
    }
}

/// An item read back from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub collection: String,
    pub attributes: AttributeMap,
}
