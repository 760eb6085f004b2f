//! Application Context
//!
//! Shared list state handed to every screen. Screens hold a `ListContext` and
//! only read from it; the reconciler owns the matching `ListWriter`.

use std::sync::Arc;
use tokio::sync::{watch, RwLock};

use crate::domain::Item;
use crate::store::{ListState, Totals};

/// Read-only handle onto the shared projections
#[derive(Clone)]
pub struct ListContext {
    state: Arc<RwLock<ListState>>,
    revision: watch::Receiver<u64>,
}

impl ListContext {
    /// Copy of both projections and totals
    pub async fn snapshot(&self) -> ListState {
        self.state.read().await.clone()
    }

    /// Items still to buy
    pub async fn items(&self) -> Vec<Item> {
        self.state.read().await.items.clone()
    }

    /// Bought items
    pub async fn cart(&self) -> Vec<Item> {
        self.state.read().await.cart.clone()
    }

    pub async fn projection(&self, bought: bool) -> Vec<Item> {
        self.state.read().await.projection(bought).to_vec()
    }

    pub async fn totals(&self) -> Totals {
        self.state.read().await.totals()
    }

    /// Revision of the last applied write
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Receiver that is notified after every write, for re-rendering
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.clone()
    }
}

/// Sole writer of the shared state
pub(crate) struct ListWriter {
    state: Arc<RwLock<ListState>>,
    revision: watch::Sender<u64>,
}

impl ListWriter {
    pub(crate) fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(ListState::default())),
            revision,
        }
    }

    pub(crate) fn context(&self) -> ListContext {
        ListContext {
            state: Arc::clone(&self.state),
            revision: self.revision.subscribe(),
        }
    }

    pub(crate) async fn read<T>(&self, f: impl FnOnce(&ListState) -> T) -> T {
        let state = self.state.read().await;
        f(&state)
    }

    /// Apply a patch and bump the revision
    pub(crate) async fn update<T>(&self, f: impl FnOnce(&mut ListState) -> T) -> T {
        let out = {
            let mut state = self.state.write().await;
            f(&mut state)
        };
        self.revision.send_modify(|revision| *revision += 1);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::store_insert_item;

    #[tokio::test]
    async fn test_context_sees_writes() {
        let writer = ListWriter::new();
        let context = writer.context();
        let mut receiver = context.subscribe();
        assert_eq!(context.revision(), 0);

        writer
            .update(|state| {
                store_insert_item(state, Item::new(1, "Milk".into(), "2".into(), Some(150)));
                state.items_total = 150;
            })
            .await;

        assert!(receiver.has_changed().unwrap());
        assert_eq!(*receiver.borrow_and_update(), 1);
        assert_eq!(context.revision(), 1);
        assert_eq!(context.items().await.len(), 1);
        assert!(context.cart().await.is_empty());
        assert_eq!(context.totals().await.items, 150);
    }

    #[tokio::test]
    async fn test_contexts_share_state() {
        let writer = ListWriter::new();
        let items_screen = writer.context();
        let cart_screen = items_screen.clone();

        writer
            .update(|state| {
                store_insert_item(state, Item { bought: true, ..Item::new(3, "Tea".into(), "1".into(), None) });
            })
            .await;

        assert_eq!(items_screen.snapshot().await, cart_screen.snapshot().await);
        assert_eq!(cart_screen.projection(true).await[0].id, 3);
    }
}
