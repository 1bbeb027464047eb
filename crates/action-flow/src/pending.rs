//! Per-product pending markers for add-to-cart.
//!
//! The click on a product's add button and the confirmation popup are separated by
//! several settle delays. Each trigger takes a generation for its product; the popup
//! phase only acts while its generation is still the current one, so a stale trigger
//! never clicks a popup opened by a newer one, and a finished one never clicks at all.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct PendingCart {
    entries: DashMap<String, u64>,
    next: AtomicU64,
}

impl PendingCart {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(product: &str) -> String {
        product.trim().to_lowercase()
    }

    /// Mark `product` pending; the returned guard clears it on drop.
    pub fn begin(self: &Arc<Self>, product: &str) -> PendingGuard {
        let key = Self::key(product);
        let generation = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.entries.insert(key.clone(), generation);
        PendingGuard {
            cart: Arc::clone(self),
            key,
            generation,
        }
    }

    pub fn is_pending(&self, product: &str) -> bool {
        self.entries.contains_key(&Self::key(product))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ownership of one product's pending marker.
#[derive(Debug)]
pub struct PendingGuard {
    cart: Arc<PendingCart>,
    key: String,
    generation: u64,
}

impl PendingGuard {
    /// Still the latest trigger for this product and not yet cleared.
    pub fn is_current(&self) -> bool {
        self.cart
            .entries
            .get(&self.key)
            .is_some_and(|entry| *entry.value() == self.generation)
    }

    /// Clear the marker if this guard still owns it.
    pub fn clear(&self) {
        let generation = self.generation;
        self.cart
            .entries
            .remove_if(&self.key, |_, current| *current == generation);
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_clears_on_drop() {
        let cart = Arc::new(PendingCart::new());
        {
            let guard = cart.begin("Echo Dot");
            assert!(guard.is_current());
            assert!(cart.is_pending("echo dot"));
        }
        assert!(cart.is_empty());
    }

    #[test]
    fn newer_trigger_supersedes_older() {
        let cart = Arc::new(PendingCart::new());
        let first = cart.begin("Echo Dot");
        let second = cart.begin("Echo Dot");

        assert!(!first.is_current());
        assert!(second.is_current());

        drop(first);
        assert!(second.is_current());
    }

    #[test]
    fn cleared_marker_is_not_current() {
        let cart = Arc::new(PendingCart::new());
        let guard = cart.begin("Kindle");
        guard.clear();
        assert!(!guard.is_current());
        assert!(!cart.is_pending("Kindle"));
    }
}
