//! List State Store
//!
//! The two projections (items to buy, cart) with their running totals, and the
//! helpers that patch them after a mutation.

use serde::{Deserialize, Serialize};

use crate::domain::{assign_display_indices, Item};

/// Both projections and their totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListState {
    /// Items still to buy, ascending id
    pub items: Vec<Item>,
    /// Bought items, ascending id
    pub cart: Vec<Item>,
    pub items_total: u64,
    pub cart_total: u64,
}

/// Running totals of both projections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub items: u64,
    pub cart: u64,
}

impl ListState {
    pub fn projection(&self, bought: bool) -> &[Item] {
        if bought {
            &self.cart
        } else {
            &self.items
        }
    }

    pub fn totals(&self) -> Totals {
        Totals {
            items: self.items_total,
            cart: self.cart_total,
        }
    }

    pub fn find(&self, id: u32) -> Option<&Item> {
        self.items.iter().chain(self.cart.iter()).find(|item| item.id == id)
    }

    /// Which projection holds the id: `Some(bought)`, or `None` if neither
    pub fn location(&self, id: u32) -> Option<bool> {
        if self.items.iter().any(|item| item.id == id) {
            Some(false)
        } else if self.cart.iter().any(|item| item.id == id) {
            Some(true)
        } else {
            None
        }
    }

    pub(crate) fn set_total(&mut self, bought: bool, total: u64) {
        if bought {
            self.cart_total = total;
        } else {
            self.items_total = total;
        }
    }

    pub(crate) fn replace_projection(&mut self, bought: bool, items: Vec<Item>, total: u64) {
        *self.projection_mut(bought) = items;
        self.set_total(bought, total);
    }

    fn projection_mut(&mut self, bought: bool) -> &mut Vec<Item> {
        if bought {
            &mut self.cart
        } else {
            &mut self.items
        }
    }
}

// ========================
// Store Helper Functions
// ========================

/// Place an item in the projection matching its status, keeping ascending id
/// order, and renumber. Returns the item as placed.
pub fn store_insert_item(state: &mut ListState, item: Item) -> Item {
    let list = state.projection_mut(item.bought);
    let pos = list.partition_point(|existing| existing.id < item.id);

    if list.get(pos).map(|existing| existing.id) == Some(item.id) {
        list[pos] = item;
    } else {
        list.insert(pos, item);
    }
    assign_display_indices(list);
    list[pos].clone()
}

/// Replace an item in place, keeping its display index.
/// Returns `None` if its projection does not hold it.
pub fn store_update_item(state: &mut ListState, updated: Item) -> Option<Item> {
    let entry = state
        .projection_mut(updated.bought)
        .iter_mut()
        .find(|item| item.id == updated.id)?;

    let display_index = entry.display_index;
    *entry = Item {
        display_index,
        ..updated
    };
    Some(entry.clone())
}

/// Remove an item from whichever projection holds it and renumber that one
pub fn store_remove_item(state: &mut ListState, item_id: u32) -> Option<Item> {
    let bought = state.location(item_id)?;
    let list = state.projection_mut(bought);
    let pos = list.iter().position(|item| item.id == item_id)?;

    let removed = list.remove(pos);
    assign_display_indices(list);
    Some(removed)
}
