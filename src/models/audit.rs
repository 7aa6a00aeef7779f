use super::{TableItem, string_attr, uuid_attr};
use crate::core::batch::{AttributeMap, AttributeValue, ItemKey};
use crate::utils::error::{BatchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit trail entry, stored in `audits` keyed by (`id`, `product_id`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    pub id: Uuid,
    pub product_id: Uuid,
    pub action: String,
    pub time_stamp: DateTime<Utc>,
}

impl Audit {
    pub fn new(product_id: Uuid, action: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            action: action.into(),
            time_stamp: Utc::now(),
        }
    }
}

impl TableItem for Audit {
    const COLLECTION: &'static str = "audits";

    fn key(&self) -> ItemKey {
        ItemKey::hash("id", AttributeValue::string(self.id.to_string()))
            .with_range("product_id", AttributeValue::string(self.product_id.to_string()))
    }

    fn to_attributes(&self) -> AttributeMap {
        let mut attrs = AttributeMap::new();
        attrs.insert("action".to_string(), AttributeValue::string(&self.action));
        attrs.insert(
            "time_stamp".to_string(),
            AttributeValue::string(self.time_stamp.to_rfc3339()),
        );
        attrs
    }

    fn from_record(record: &AttributeMap) -> Result<Self> {
        let raw = string_attr(record, "time_stamp")?;
        let time_stamp = DateTime::parse_from_rfc3339(raw)
            .map_err(|e| BatchError::internal(format!("invalid stored time_stamp '{raw}': {e}")))?
            .with_timezone(&Utc);
        Ok(Self {
            id: uuid_attr(record, "id")?,
            product_id: uuid_attr(record, "product_id")?,
            action: string_attr(record, "action")?.to_string(),
            time_stamp,
        })
    }
}
