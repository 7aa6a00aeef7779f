use super::Product;
use crate::utils::error::{BatchError, Result};
use serde::{Deserialize, Serialize};

/// Request body entry for product creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProductDto {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
}

impl CreateProductDto {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(BatchError::validation("product name must not be empty"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(BatchError::validation(format!(
                "product '{}' has an invalid price {}",
                self.name, self.price
            )));
        }
        Ok(())
    }

    /// Validate and build the product, assigning its id
    pub fn into_product(self) -> Result<Product> {
        self.validate()?;
        Ok(Product::new(self.name, self.description, self.price))
    }
}
