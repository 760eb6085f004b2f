//! List Reconciler
//!
//! Runs each mutation against the repository, then patches the shared
//! projections in memory. Totals are always re-read from the repository. When a
//! patch finds the projections out of step with the store (the id is not where
//! the projection says it is) both projections are re-fetched instead.

use crate::context::{ListContext, ListWriter};
use crate::domain::{DomainError, DomainResult, Item, ItemDraft};
use crate::repository::GroceryRepository;
use crate::store::{store_insert_item, store_remove_item, store_update_item, ListState};

pub struct ListReconciler<R> {
    repo: R,
    writer: ListWriter,
}

impl<R: GroceryRepository> ListReconciler<R> {
    /// Starts with empty projections; call `refresh_all` to load them.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            writer: ListWriter::new(),
        }
    }

    /// A read-only handle for a screen
    pub fn context(&self) -> ListContext {
        self.writer.context()
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Re-fetch both projections and totals
    pub async fn refresh_all(&self) -> DomainResult<()> {
        let items = self.repo.list_by_status(false).await?;
        let cart = self.repo.list_by_status(true).await?;
        let items_total = self.repo.sum_price(false).await?;
        let cart_total = self.repo.sum_price(true).await?;

        log::debug!("Refreshed lists: {} to buy, {} in cart", items.len(), cart.len());
        self.writer
            .update(|state| {
                *state = ListState {
                    items,
                    cart,
                    items_total,
                    cart_total,
                }
            })
            .await;
        Ok(())
    }

    /// Re-fetch a single projection and its total
    pub async fn refresh(&self, bought: bool) -> DomainResult<()> {
        let list = self.repo.list_by_status(bought).await?;
        let total = self.repo.sum_price(bought).await?;

        self.writer
            .update(|state| state.replace_projection(bought, list, total))
            .await;
        Ok(())
    }

    pub async fn create(&self, draft: &ItemDraft) -> DomainResult<Item> {
        let created = self.repo.create(draft).await?;
        let total = self.repo.sum_price(false).await?;

        let placed = self
            .writer
            .update(|state| {
                let placed = store_insert_item(state, created);
                state.set_total(false, total);
                placed
            })
            .await;
        Ok(placed)
    }

    /// Rename, requantify or reprice. Patched in place; the total is only
    /// re-read when the price changed.
    pub async fn rename(&self, id: u32, draft: &ItemDraft) -> DomainResult<Item> {
        let previous = self.writer.read(|state| state.find(id).cloned()).await;
        let updated = self.repo.rename(id, draft).await?;

        let total = match &previous {
            Some(prev) if prev.price == updated.price => None,
            _ => Some(self.repo.sum_price(updated.bought).await?),
        };

        let bought = updated.bought;
        let patched = self
            .writer
            .update(|state| {
                let patched = store_update_item(state, updated);
                if let (Some(_), Some(total)) = (&patched, total) {
                    state.set_total(bought, total);
                }
                patched
            })
            .await;

        match patched {
            Some(item) => Ok(item),
            None => self.resync(id).await,
        }
    }

    /// Remove an item from the store and from whichever projection holds it
    pub async fn delete(&self, id: u32) -> DomainResult<()> {
        self.repo.delete(id).await?;

        match self.writer.read(|state| state.location(id)).await {
            Some(bought) => {
                let total = self.repo.sum_price(bought).await?;
                self.writer
                    .update(|state| {
                        store_remove_item(state, id);
                        state.set_total(bought, total);
                    })
                    .await;
            }
            None => {
                log::warn!("Deleted item {} was not in any projection, refetching", id);
                self.refresh_all().await?;
            }
        }
        Ok(())
    }

    /// Move an item between the to-buy list and the cart
    pub async fn toggle_bought(&self, id: u32) -> DomainResult<Item> {
        let toggled = self.repo.toggle_bought(id).await?;
        let source = !toggled.bought;
        if self.writer.read(|state| state.location(id)).await != Some(source) {
            return self.resync(id).await;
        }
        let items_total = self.repo.sum_price(false).await?;
        let cart_total = self.repo.sum_price(true).await?;

        let placed = self
            .writer
            .update(|state| {
                if state.location(id) != Some(source) {
                    return None;
                }
                store_remove_item(state, id);
                let placed = store_insert_item(state, toggled);
                state.items_total = items_total;
                state.cart_total = cart_total;
                Some(placed)
            })
            .await;

        match placed {
            Some(item) => Ok(item),
            None => self.resync(id).await,
        }
    }

    /// Full re-fetch after a failed patch, returning the item as now listed
    async fn resync(&self, id: u32) -> DomainResult<Item> {
        log::warn!("Item {} not where the projections expected, refetching", id);
        self.refresh_all().await?;
        self.writer
            .read(|state| state.find(id).cloned())
            .await
            .ok_or(DomainError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{init_db, ItemRepository};
    use std::path::Path;

    async fn setup() -> ListReconciler<ItemRepository> {
        let db_state = init_db(Path::new(":memory:")).await.expect("Failed to init test DB");
        let reconciler = ListReconciler::new(ItemRepository::new(db_state.connection()));
        reconciler.refresh_all().await.unwrap();
        reconciler
    }

    fn draft(name: &str, quantity: &str, price: Option<u32>) -> ItemDraft {
        ItemDraft::new(name, quantity, price)
    }

    /// What a full re-fetch would show right now
    async fn fetched(reconciler: &ListReconciler<ItemRepository>) -> ListState {
        let repo = reconciler.repository();
        ListState {
            items: repo.list_by_status(false).await.unwrap(),
            cart: repo.list_by_status(true).await.unwrap(),
            items_total: repo.sum_price(false).await.unwrap(),
            cart_total: repo.sum_price(true).await.unwrap(),
        }
    }

    async fn assert_in_sync(reconciler: &ListReconciler<ItemRepository>) {
        assert_eq!(reconciler.context().snapshot().await, fetched(reconciler).await);
    }

    #[tokio::test]
    async fn test_create_appends_to_items() {
        let reconciler = setup().await;

        reconciler.create(&draft("Milk", "2", Some(150))).await.unwrap();
        let bread = reconciler.create(&draft("Bread", "1", None)).await.unwrap();

        assert_eq!(bread.display_index, 2);
        let totals = reconciler.context().totals().await;
        assert_eq!(totals.items, 150);
        assert_eq!(totals.cart, 0);
        assert_in_sync(&reconciler).await;
    }

    #[tokio::test]
    async fn test_failed_create_leaves_state() {
        let reconciler = setup().await;
        reconciler.create(&draft("Milk", "2", Some(150))).await.unwrap();
        let before = reconciler.context().snapshot().await;
        let revision = reconciler.context().revision();

        let result = reconciler.create(&draft("Milk", "1", Some(90))).await;

        assert_eq!(result, Err(DomainError::DuplicateName("Milk".to_string())));
        assert_eq!(reconciler.context().snapshot().await, before);
        assert_eq!(reconciler.context().revision(), revision);
    }

    #[tokio::test]
    async fn test_toggle_moves_between_projections() {
        let reconciler = setup().await;
        reconciler.create(&draft("Milk", "2", Some(150))).await.unwrap();
        let eggs = reconciler.create(&draft("Eggs", "12", Some(200))).await.unwrap();

        let moved = reconciler.toggle_bought(eggs.id).await.unwrap();

        assert!(moved.bought);
        assert_eq!(moved.display_index, 1);
        let state = reconciler.context().snapshot().await;
        assert_eq!(state.cart_total, 200);
        assert_eq!(state.items_total, 150);
        assert!(state.items.iter().all(|i| i.id != eggs.id));
        assert_in_sync(&reconciler).await;
    }

    #[tokio::test]
    async fn test_toggle_back_restores_order() {
        let reconciler = setup().await;
        let milk = reconciler.create(&draft("Milk", "2", Some(150))).await.unwrap();
        reconciler.create(&draft("Eggs", "12", Some(200))).await.unwrap();

        reconciler.toggle_bought(milk.id).await.unwrap();
        let back = reconciler.toggle_bought(milk.id).await.unwrap();

        assert!(!back.bought);
        assert_eq!(back.display_index, 1);
        assert!(reconciler.context().cart().await.is_empty());
        assert_in_sync(&reconciler).await;
    }

    #[tokio::test]
    async fn test_delete_renumbers_remaining() {
        let reconciler = setup().await;
        let milk = reconciler.create(&draft("Milk", "2", Some(150))).await.unwrap();
        reconciler.create(&draft("Eggs", "12", Some(200))).await.unwrap();
        reconciler.create(&draft("Tea", "1", Some(80))).await.unwrap();

        reconciler.delete(milk.id).await.unwrap();

        let items = reconciler.context().items().await;
        assert_eq!(items.iter().map(|i| i.display_index).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(reconciler.context().totals().await.items, 280);
        assert_in_sync(&reconciler).await;
    }

    #[tokio::test]
    async fn test_delete_from_cart() {
        let reconciler = setup().await;
        let tea = reconciler.create(&draft("Tea", "1", Some(80))).await.unwrap();
        reconciler.toggle_bought(tea.id).await.unwrap();

        reconciler.delete(tea.id).await.unwrap();

        let state = reconciler.context().snapshot().await;
        assert!(state.cart.is_empty());
        assert_eq!(state.cart_total, 0);
    }

    #[tokio::test]
    async fn test_delete_missing_leaves_state() {
        let reconciler = setup().await;
        reconciler.create(&draft("Milk", "2", Some(150))).await.unwrap();
        let before = reconciler.context().snapshot().await;

        assert_eq!(reconciler.delete(999).await, Err(DomainError::NotFound(999)));
        assert_eq!(reconciler.context().snapshot().await, before);
    }

    #[tokio::test]
    async fn test_rename_patches_in_place() {
        let reconciler = setup().await;
        reconciler.create(&draft("Milk", "2", Some(150))).await.unwrap();
        let bread = reconciler.create(&draft("Bread", "1", Some(40))).await.unwrap();

        let renamed = reconciler.rename(bread.id, &draft("Rye bread", "2", Some(40))).await.unwrap();
        assert_eq!(renamed.display_index, 2);
        assert_eq!(renamed.name, "Rye bread");
        assert_eq!(reconciler.context().totals().await.items, 190);

        let repriced = reconciler.rename(bread.id, &draft("Rye bread", "2", Some(60))).await.unwrap();
        assert_eq!(repriced.price, Some(60));
        assert_eq!(reconciler.context().totals().await.items, 210);
        assert_in_sync(&reconciler).await;
    }

    #[tokio::test]
    async fn test_stale_projection_falls_back_to_refetch() {
        let reconciler = setup().await;
        // Written behind the reconciler's back
        let hidden = reconciler.repository().create(&draft("Hidden", "1", Some(30))).await.unwrap();

        let moved = reconciler.toggle_bought(hidden.id).await.unwrap();
        assert!(moved.bought);
        assert_in_sync(&reconciler).await;

        let other = reconciler.repository().create(&draft("Other", "1", None)).await.unwrap();
        reconciler.delete(other.id).await.unwrap();
        assert_in_sync(&reconciler).await;
    }

    #[tokio::test]
    async fn test_refresh_reloads_one_projection() {
        let reconciler = setup().await;
        let tea = reconciler.create(&draft("Tea", "1", Some(80))).await.unwrap();
        reconciler.toggle_bought(tea.id).await.unwrap();
        reconciler.create(&draft("Milk", "2", Some(150))).await.unwrap();

        // Written behind the reconciler's back, one in each status
        reconciler.repository().create(&draft("Bread", "1", Some(40))).await.unwrap();
        let rice = reconciler.repository().create(&draft("Rice", "1", Some(90))).await.unwrap();
        reconciler.repository().toggle_bought(rice.id).await.unwrap();
        let cart_before = reconciler.context().cart().await;

        reconciler.refresh(false).await.unwrap();

        let state = reconciler.context().snapshot().await;
        let names: Vec<_> = state.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Milk", "Bread"]);
        assert_eq!(state.items.iter().map(|i| i.display_index).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(state.items_total, 190);
        assert_eq!(state.cart, cart_before);
        assert_eq!(state.cart_total, 80);

        reconciler.refresh(true).await.unwrap();
        let state = reconciler.context().snapshot().await;
        assert_eq!(state.cart.len(), 2);
        assert_eq!(state.cart_total, 170);
        assert_in_sync(&reconciler).await;
    }

    #[tokio::test]
    async fn test_stale_toggle_notifies_once() {
        let reconciler = setup().await;
        let hidden = reconciler.repository().create(&draft("Hidden", "1", Some(30))).await.unwrap();
        let revision = reconciler.context().revision();

        reconciler.toggle_bought(hidden.id).await.unwrap();

        assert_eq!(reconciler.context().revision(), revision + 1);
        assert_in_sync(&reconciler).await;
    }

    #[tokio::test]
    async fn test_subscribers_are_notified() {
        let reconciler = setup().await;
        let mut receiver = reconciler.context().subscribe();

        reconciler.create(&draft("Milk", "2", Some(150))).await.unwrap();
        assert!(receiver.has_changed().unwrap());
        let _ = receiver.borrow_and_update();

        let _ = reconciler.toggle_bought(12345).await;
        assert!(!receiver.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_scenario_sequence_stays_consistent() {
        let reconciler = setup().await;
        let mut ids = Vec::new();
        for (name, price) in [("Milk", Some(150)), ("Eggs", Some(200)), ("Bread", None), ("Rice", Some(90))] {
            ids.push(reconciler.create(&draft(name, "1", price)).await.unwrap().id);
        }

        reconciler.toggle_bought(ids[2]).await.unwrap();
        reconciler.toggle_bought(ids[0]).await.unwrap();
        reconciler.rename(ids[1], &draft("Brown eggs", "6", Some(120))).await.unwrap();
        reconciler.delete(ids[3]).await.unwrap();
        reconciler.toggle_bought(ids[2]).await.unwrap();
        assert_in_sync(&reconciler).await;

        let state = reconciler.context().snapshot().await;
        assert_eq!(state.items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![ids[1], ids[2]]);
        assert_eq!(state.cart.iter().map(|i| i.id).collect::<Vec<_>>(), vec![ids[0]]);
        assert_eq!(state.items_total, 120);
        assert_eq!(state.cart_total, 150);
    }
}
