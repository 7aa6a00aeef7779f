//! Domain records and their item mapping
//!
//! Each record kind maps itself to and from store attributes through
//! [`TableItem`]. The batch core never inspects domain fields.

mod audit;
mod dto;
mod product;

pub use audit::Audit;
pub use dto::CreateProductDto;
pub use product::Product;

use crate::core::batch::{AttributeMap, AttributeValue, ItemKey, ItemRef, WriteItem};
use crate::utils::error::{BatchError, Result};
use uuid::Uuid;

/// Explicit key/value mapping of one record kind
pub trait TableItem: Sized {
    /// Collection the records live in
    const COLLECTION: &'static str;

    /// Primary key of this record
    fn key(&self) -> ItemKey;

    /// Non-key attributes
    fn to_attributes(&self) -> AttributeMap;

    /// Rebuild a record from its stored attributes
    fn from_record(record: &AttributeMap) -> Result<Self>;

    fn to_write_item(&self) -> WriteItem {
        WriteItem::new(Self::COLLECTION, self.key(), self.to_attributes())
    }

    fn item_ref(&self) -> ItemRef {
        ItemRef::new(Self::COLLECTION, self.key())
    }
}

pub(crate) fn string_attr<'a>(record: &'a AttributeMap, name: &str) -> Result<&'a str> {
    record
        .get(name)
        .and_then(AttributeValue::as_s)
        .ok_or_else(|| BatchError::internal(format!("stored record has no string attribute '{name}'")))
}

pub(crate) fn uuid_attr(record: &AttributeMap, name: &str) -> Result<Uuid> {
    let raw = string_attr(record, name)?;
    Uuid::parse_str(raw)
        .map_err(|e| BatchError::internal(format!("attribute '{name}' is not a UUID: {e}")))
}
