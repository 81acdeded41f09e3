use core::str::FromStr;

use serde::{Deserialize, Serialize};

use beerstock_core::{BeerId, DomainError};

/// Beer style. Closed set; no ordering semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BeerType {
    Lager,
    Malzbier,
    Witbier,
    Weiss,
    Ale,
    Ipa,
    Stout,
}

impl BeerType {
    pub const ALL: [BeerType; 7] = [
        BeerType::Lager,
        BeerType::Malzbier,
        BeerType::Witbier,
        BeerType::Weiss,
        BeerType::Ale,
        BeerType::Ipa,
        BeerType::Stout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BeerType::Lager => "LAGER",
            BeerType::Malzbier => "MALZBIER",
            BeerType::Witbier => "WITBIER",
            BeerType::Weiss => "WEISS",
            BeerType::Ale => "ALE",
            BeerType::Ipa => "IPA",
            BeerType::Stout => "STOUT",
        }
    }
}

impl core::fmt::Display for BeerType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BeerType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BeerType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown beer type: {s}")))
    }
}

/// Stored representation of a catalog entry.
///
/// `id` is `None` until the record store assigns one on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockItem {
    pub id: Option<BeerId>,
    pub name: String,
    pub brand: String,
    pub max: u32,
    pub quantity: u32,
    pub beer_type: BeerType,
}

impl StockItem {
    /// Room left before `quantity` reaches `max`.
    pub fn headroom(&self) -> u32 {
        self.max.saturating_sub(self.quantity)
    }
}

/// Externally-visible representation of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItemDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BeerId>,
    pub name: String,
    pub brand: String,
    pub max: u32,
    pub quantity: u32,
    #[serde(rename = "type")]
    pub beer_type: BeerType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beer_type_parses_case_insensitively() {
        assert_eq!("lager".parse::<BeerType>().unwrap(), BeerType::Lager);
        assert_eq!(" IPA ".parse::<BeerType>().unwrap(), BeerType::Ipa);
        assert!("pilsner".parse::<BeerType>().is_err());
    }

    #[test]
    fn beer_type_tags_round_trip_through_as_str() {
        for t in BeerType::ALL {
            assert_eq!(t.as_str().parse::<BeerType>().unwrap(), t);
        }
    }

    #[test]
    fn dto_uses_type_as_json_field_and_omits_missing_id() {
        let dto = StockItemDto {
            id: None,
            name: "Brahma".to_string(),
            brand: "Ambev".to_string(),
            max: 50,
            quantity: 10,
            beer_type: BeerType::Lager,
        };

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["type"], "LAGER");
        assert!(json.get("id").is_none());

        let parsed: StockItemDto = serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "Brahma",
            "brand": "Ambev",
            "max": 50,
            "quantity": 10,
            "type": "LAGER"
        }))
        .unwrap();
        assert_eq!(parsed.id, Some(BeerId::new(3)));
    }

    #[test]
    fn headroom_is_distance_to_max() {
        let item = StockItem {
            id: Some(BeerId::new(1)),
            name: "Brahma".to_string(),
            brand: "Ambev".to_string(),
            max: 50,
            quantity: 10,
            beer_type: BeerType::Lager,
        };
        assert_eq!(item.headroom(), 40);
    }
}
