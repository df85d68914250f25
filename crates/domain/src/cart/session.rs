use crate::catalog::{Product, Variant};
use crate::error::CartError;

use super::{Cart, CartAccess, CartItem, CartSnapshotStore};

/// Key the cart snapshot is stored under.
pub const CART_SNAPSHOT_KEY: &str = "cart";

/// A cart bound to its snapshot storage for the lifetime of a session.
///
/// `open` restores the last snapshot and every mutation writes the full
/// line list back. Persistence failures are logged and otherwise ignored;
/// the in-memory cart stays authoritative.
pub struct CartSession<P: CartSnapshotStore> {
    cart: Cart,
    snapshots: P,
}

impl<P: CartSnapshotStore> CartSession<P> {
    /// Restores the cart from the snapshot store.
    ///
    /// A missing, unreadable or corrupt snapshot yields an empty cart.
    pub fn open(snapshots: P) -> Self {
        let cart = match snapshots.load(CART_SNAPSHOT_KEY) {
            Ok(Some(contents)) => match serde_json::from_str::<Vec<CartItem>>(&contents) {
                Ok(items) => Cart::from_items(items),
                Err(error) => {
                    tracing::warn!(%error, "discarding corrupt cart snapshot");
                    Cart::new()
                }
            },
            Ok(None) => Cart::new(),
            Err(error) => {
                tracing::warn!(%error, "failed to load cart snapshot");
                Cart::new()
            }
        };
        tracing::debug!(lines = cart.item_count(), "cart session opened");
        Self { cart, snapshots }
    }

    /// Ends the session, writing a final snapshot.
    pub fn close(self) -> Cart {
        self.persist();
        self.cart
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn add_item(&mut self, product: &Product, variant: Option<&Variant>) {
        self.cart.add_item(product, variant);
        self.persist();
    }

    pub fn update_quantity(
        &mut self,
        product_id: &str,
        variant_id: Option<&str>,
        quantity: i64,
    ) -> Result<(), CartError> {
        self.cart.update_quantity(product_id, variant_id, quantity)?;
        self.persist();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str, variant_id: Option<&str>) -> Result<(), CartError> {
        self.cart.remove_item(product_id, variant_id)?;
        self.persist();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.cart.clear();
        self.persist();
    }

    fn persist(&self) {
        let contents = match serde_json::to_string(&self.cart) {
            Ok(contents) => contents,
            Err(error) => {
                tracing::warn!(%error, "failed to serialize cart snapshot");
                return;
            }
        };
        if let Err(error) = self.snapshots.save(CART_SNAPSHOT_KEY, &contents) {
            tracing::warn!(%error, "failed to persist cart snapshot");
        }
    }
}

impl<P: CartSnapshotStore> CartAccess for CartSession<P> {
    fn lines(&self) -> &[CartItem] {
        self.cart.items()
    }

    fn clear(&mut self) {
        CartSession::clear(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::MemorySnapshotStore;
    use crate::value_objects::{Money, ProductId};

    fn product() -> Product {
        Product {
            id: ProductId::new("p1"),
            name: "Mug".into(),
            base_price: Money::from_cents(800),
            ..Default::default()
        }
    }

    #[test]
    fn test_mutations_are_persisted_and_restored() {
        let snapshots = MemorySnapshotStore::new();
        let mut session = CartSession::open(snapshots.clone());
        session.add_item(&product(), None);
        session.update_quantity("p1", None, 4).unwrap();

        let restored = CartSession::open(snapshots);
        assert_eq!(restored.cart().total_units(), 4);
        assert_eq!(restored.cart().subtotal().cents(), 3200);
    }

    #[test]
    fn test_corrupt_snapshot_opens_empty() {
        let snapshots = MemorySnapshotStore::new();
        snapshots.save(CART_SNAPSHOT_KEY, "{not json").unwrap();

        let session = CartSession::open(snapshots);
        assert!(session.cart().is_empty());
    }

    #[test]
    fn test_failed_persistence_keeps_in_memory_state() {
        let snapshots = MemorySnapshotStore::new();
        let mut session = CartSession::open(snapshots.clone());
        snapshots.set_fail_writes(true);

        session.add_item(&product(), None);
        assert_eq!(session.cart().item_count(), 1);

        snapshots.set_fail_writes(false);
        let cart = session.close();
        assert_eq!(cart.item_count(), 1);
        assert!(snapshots.load(CART_SNAPSHOT_KEY).unwrap().is_some());
    }

    #[test]
    fn test_clear_through_cart_access() {
        let snapshots = MemorySnapshotStore::new();
        let mut session = CartSession::open(snapshots.clone());
        session.add_item(&product(), None);

        CartAccess::clear(&mut session);
        assert!(session.lines().is_empty());
        assert_eq!(snapshots.load(CART_SNAPSHOT_KEY).unwrap().as_deref(), Some("[]"));
    }
}
