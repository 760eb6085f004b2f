//! Repository Layer - Core Traits
//!
//! Defines the abstract interface for grocery item storage.
//! The reconciler is generic over it; SQLite is the shipped backend.

use async_trait::async_trait;

use crate::domain::{DomainResult, Item, ItemDraft};

/// Typed item operations, each one an atomic unit of work against the store.
///
/// Mutations that match no row fail with `DomainError::NotFound`.
#[async_trait]
pub trait GroceryRepository: Send + Sync {
    /// Insert a new unbought item. Rejects blank and duplicate names.
    async fn create(&self, draft: &ItemDraft) -> DomainResult<Item>;

    /// Find item by ID
    async fn find_by_id(&self, id: u32) -> DomainResult<Option<Item>>;

    /// Replace name, quantity and price. The name must stay unique.
    async fn rename(&self, id: u32, draft: &ItemDraft) -> DomainResult<Item>;

    /// Delete item permanently
    async fn delete(&self, id: u32) -> DomainResult<()>;

    /// Flip the bought flag and return the updated item
    async fn toggle_bought(&self, id: u32) -> DomainResult<Item>;

    /// Items with the given status in ascending id order, numbered 1..N
    async fn list_by_status(&self, bought: bool) -> DomainResult<Vec<Item>>;

    /// Sum of prices with the given status; 0 for an empty set
    async fn sum_price(&self, bought: bool) -> DomainResult<u64>;
}
