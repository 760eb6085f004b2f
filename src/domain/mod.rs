//! Domain Layer
//!
//! Contains the grocery item entity, its input draft and the projection rules.
//! This layer has NO external dependencies (except serde and thiserror).

mod error;
mod item;
mod projection;

pub use error::{DomainError, DomainResult};
pub use item::{normalize_name, parse_price, Item, ItemDraft};
pub use projection::{assign_display_indices, total_price};
