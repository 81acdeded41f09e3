//! Conversion between the external and stored item representations.
//!
//! Mapping is a pure field copy: no validation, no side effects. Business
//! rules belong to [`crate::StockService`].

use crate::item::{StockItem, StockItemDto};

pub trait StockMapper: Send + Sync {
    fn to_stored(&self, dto: StockItemDto) -> StockItem;
    fn to_external(&self, item: StockItem) -> StockItemDto;
}

/// Field-for-field mapper.
#[derive(Debug, Default, Clone, Copy)]
pub struct StockItemMapper;

impl StockMapper for StockItemMapper {
    fn to_stored(&self, dto: StockItemDto) -> StockItem {
        StockItem {
            id: dto.id,
            name: dto.name,
            brand: dto.brand,
            max: dto.max,
            quantity: dto.quantity,
            beer_type: dto.beer_type,
        }
    }

    fn to_external(&self, item: StockItem) -> StockItemDto {
        StockItemDto {
            id: item.id,
            name: item.name,
            brand: item.brand,
            max: item.max,
            quantity: item.quantity,
            beer_type: item.beer_type,
        }
    }
}
