//! Item Entity
//!
//! A grocery entry with a name, a free-text quantity and an optional price.

use serde::{Deserialize, Serialize};

use super::error::{DomainError, DomainResult};

/// A grocery item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier, assigned by the store
    pub id: u32,
    /// Item name, unique across the whole list
    pub name: String,
    /// Free-form quantity ("2", "1 kg", "a dozen")
    pub quantity: String,
    /// Price in whole currency units; `None` when not entered
    pub price: Option<u32>,
    /// In the cart (bought) or still to buy
    pub bought: bool,
    /// 1-based position within the current projection, not persisted
    #[serde(default)]
    pub display_index: u32,
}

impl Item {
    /// Create a new unbought item with no display position yet
    pub fn new(id: u32, name: String, quantity: String, price: Option<u32>) -> Self {
        Self {
            id,
            name,
            quantity,
            price,
            bought: false,
            display_index: 0,
        }
    }

    /// Price contribution to a total; absent counts as zero
    pub fn price_or_zero(&self) -> u64 {
        self.price.map(u64::from).unwrap_or(0)
    }
}

/// Input for create and rename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    pub quantity: String,
    pub price: Option<u32>,
}

impl ItemDraft {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>, price: Option<u32>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
            price,
        }
    }

    /// Trim the name and reject blank ones
    pub fn validated(&self) -> DomainResult<ItemDraft> {
        Ok(ItemDraft {
            name: normalize_name(&self.name)?,
            quantity: self.quantity.clone(),
            price: self.price,
        })
    }
}

/// Names are compared and stored trimmed; an empty result is an error.
pub fn normalize_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// Parse price text from a form field. Blank means no price.
pub fn parse_price(input: Option<&str>) -> DomainResult<Option<u32>> {
    let text = match input.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(text) => text,
    };

    if text.starts_with('-') {
        return Err(DomainError::InvalidInput(format!(
            "Price must not be negative: '{}'",
            text
        )));
    }

    text.parse::<u32>().map(Some).map_err(|_| {
        DomainError::InvalidInput(format!("Price must be a whole number: '{}'", text))
    })
}
