//! Item Commands
//!
//! Entry points the view layer calls with raw form input. Each mutation goes
//! through the reconciler, so the shared lists are current when it returns.

use crate::domain::{parse_price, DomainResult, Item, ItemDraft};
use crate::store::Totals;
use crate::AppState;

fn draft_from_form(name: String, quantity: Option<String>, price: Option<String>) -> DomainResult<ItemDraft> {
    let price = parse_price(price.as_deref())?;
    Ok(ItemDraft::new(name, quantity.unwrap_or_default(), price))
}

/// Add an item to the to-buy list
pub async fn add_item(
    state: &AppState,
    name: String,
    quantity: Option<String>,
    price: Option<String>,
) -> DomainResult<Item> {
    let draft = draft_from_form(name, quantity, price)?;
    state.lists.create(&draft).await
}

/// Change name, quantity and price of an item
pub async fn edit_item(
    state: &AppState,
    id: u32,
    name: String,
    quantity: Option<String>,
    price: Option<String>,
) -> DomainResult<Item> {
    let draft = draft_from_form(name, quantity, price)?;
    state.lists.rename(id, &draft).await
}

/// Delete item permanently. The view layer asks for confirmation first.
pub async fn delete_item(state: &AppState, id: u32) -> DomainResult<()> {
    state.lists.delete(id).await
}

/// Move item into or out of the cart
pub async fn toggle_item(state: &AppState, id: u32) -> DomainResult<Item> {
    state.lists.toggle_bought(id).await
}

/// Pull-to-refresh: reload both lists from the store
pub async fn refresh_lists(state: &AppState) -> DomainResult<()> {
    state.lists.refresh_all().await
}

/// Current contents of one list
pub async fn list_items(state: &AppState, bought: bool) -> Vec<Item> {
    state.context().projection(bought).await
}

pub async fn get_totals(state: &AppState) -> Totals {
    state.context().totals().await
}

/// Both lists and totals as JSON, for views across an IPC boundary
pub async fn snapshot_json(state: &AppState) -> DomainResult<String> {
    let snapshot = state.context().snapshot().await;
    serde_json::to_string(&snapshot)
        .map_err(|e| crate::domain::DomainError::Store(format!("Failed to serialize lists: {}", e)))
}
