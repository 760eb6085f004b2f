//! Projection rules shared by the repository and the reconciler.

use super::item::Item;

/// Number the items 1..N in their current order
pub fn assign_display_indices(items: &mut [Item]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.display_index = index as u32 + 1;
    }
}

/// Sum of prices, absent prices counting as zero
pub fn total_price(items: &[Item]) -> u64 {
    items.iter().map(Item::price_or_zero).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u32, price: Option<u32>) -> Item {
        Item::new(id, format!("item-{}", id), "1".to_string(), price)
    }

    #[test]
    fn test_indices_are_dense() {
        let mut items = vec![item(4, None), item(9, None), item(12, None)];
        assign_display_indices(&mut items);
        let indices: Vec<u32> = items.iter().map(|i| i.display_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_total_price() {
        assert_eq!(total_price(&[]), 0);
        assert_eq!(total_price(&[item(1, Some(150)), item(2, None), item(3, Some(90))]), 240);
    }
}
