use core::num::NonZeroU32;

use serde::Deserialize;

use beerstock_core::{DomainError, DomainResult};
use beerstock_inventory::{BeerType, StockItemDto};

// -------------------------
// Boundary limits
// -------------------------

pub const MAX_TEXT_LEN: usize = 200;
pub const MAX_STOCK_CAPACITY: u32 = 500;
pub const MAX_INITIAL_QUANTITY: u32 = 100;
pub const MAX_INCREMENT: u32 = 100;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /api/v1/beers`. Any `id` field is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBeerRequest {
    pub name: String,
    pub brand: String,
    pub max: u32,
    pub quantity: u32,
    #[serde(rename = "type")]
    pub beer_type: BeerType,
}

impl CreateBeerRequest {
    /// Validate field ranges and convert into the service's input type.
    pub fn validate(self) -> DomainResult<StockItemDto> {
        let name = required_text("name", self.name)?;
        let brand = required_text("brand", self.brand)?;

        if !(1..=MAX_STOCK_CAPACITY).contains(&self.max) {
            return Err(DomainError::validation(format!(
                "max must be between 1 and {MAX_STOCK_CAPACITY}"
            )));
        }
        if self.quantity > MAX_INITIAL_QUANTITY {
            return Err(DomainError::validation(format!(
                "quantity must be at most {MAX_INITIAL_QUANTITY}"
            )));
        }
        if self.quantity > self.max {
            return Err(DomainError::validation("quantity cannot exceed max"));
        }

        Ok(StockItemDto {
            id: None,
            name,
            brand,
            max: self.max,
            quantity: self.quantity,
            beer_type: self.beer_type,
        })
    }
}

/// Body of `PATCH /api/v1/beers/{id}/increment`.
#[derive(Debug, Clone, Deserialize)]
pub struct QuantityRequest {
    pub quantity: u32,
}

impl QuantityRequest {
    pub fn validate(self) -> DomainResult<NonZeroU32> {
        NonZeroU32::new(self.quantity)
            .filter(|q| q.get() <= MAX_INCREMENT)
            .ok_or_else(|| {
                DomainError::validation(format!("quantity must be between 1 and {MAX_INCREMENT}"))
            })
    }
}

fn required_text(field: &str, value: String) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(DomainError::validation(format!(
            "{field} must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}
