use super::{TableItem, string_attr, uuid_attr};
use crate::core::batch::{AttributeMap, AttributeValue, ItemKey, ItemRef};
use crate::utils::error::{BatchError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalogue product, stored in `products` keyed by `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
}

impl Product {
    /// New product with a freshly assigned id
    pub fn new(name: impl Into<String>, description: impl Into<String>, price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            price,
        }
    }

    pub fn key_for(id: Uuid) -> ItemKey {
        ItemKey::hash("id", AttributeValue::string(id.to_string()))
    }

    pub fn ref_for(id: Uuid) -> ItemRef {
        ItemRef::new(Self::COLLECTION, Self::key_for(id))
    }
}

impl TableItem for Product {
    const COLLECTION: &'static str = "products";

    fn key(&self) -> ItemKey {
        Self::key_for(self.id)
    }

    fn to_attributes(&self) -> AttributeMap {
        let mut attrs = AttributeMap::new();
        attrs.insert("name".to_string(), AttributeValue::string(&self.name));
        attrs.insert(
            "description".to_string(),
            AttributeValue::string(&self.description),
        );
        attrs.insert("price".to_string(), AttributeValue::number(self.price));
        attrs
    }

    fn from_record(record: &AttributeMap) -> Result<Self> {
        let price = record
            .get("price")
            .and_then(AttributeValue::as_n)
            .ok_or_else(|| BatchError::internal("stored product has no numeric price"))?;
        Ok(Self {
            id: uuid_attr(record, "id")?,
            name: string_attr(record, "name")?.to_string(),
            description: string_attr(record, "description")?.to_string(),
            price: price
                .parse()
                .map_err(|e| BatchError::internal(format!("invalid stored price '{price}': {e}")))?,
        })
    }
}
