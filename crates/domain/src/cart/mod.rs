//! Shopping cart aggregate.

mod session;
mod snapshot;

use serde::{Deserialize, Serialize};

use crate::catalog::{Product, Variant};
use crate::error::CartError;
use crate::value_objects::{Money, ProductId, VariantId};

pub use session::{CART_SNAPSHOT_KEY, CartSession};
pub use snapshot::{CartSnapshotStore, FileSnapshotStore, MemorySnapshotStore};

/// A line in the cart, unique by product and variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CartItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub name: String,
    pub brand: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub unit_price: Option<Money>,
    pub original_price: Option<Money>,
    pub discount_percent: u8,
    pub quantity: u32,
    /// Stock shown when the item was added. Informational only.
    pub available_stock: u32,
    pub image: Option<String>,
}

impl CartItem {
    /// Builds a single-unit line from a catalog product and optional variant.
    pub fn from_catalog(product: &Product, variant: Option<&Variant>) -> Self {
        let original = variant
            .and_then(|v| v.price)
            .unwrap_or(product.base_price);
        let discount = product.discount_percent.min(100);
        let unit_price = if discount > 0 {
            original.percent_off(discount)
        } else {
            original
        };
        let stock = variant.map_or(product.stock, |v| v.stock);

        Self {
            product_id: product.id.clone(),
            variant_id: variant.map(|v| v.id.clone()),
            name: product.name.clone(),
            brand: product.brand.clone(),
            color: variant.and_then(|v| v.color.clone()),
            size: variant.and_then(|v| v.size.clone()),
            unit_price: Some(unit_price),
            original_price: Some(original),
            discount_percent: discount,
            quantity: 1,
            available_stock: u32::try_from(stock.max(0)).unwrap_or(u32::MAX),
            image: variant
                .and_then(|v| v.image.clone())
                .or_else(|| product.primary_image().map(str::to_string)),
        }
    }

    /// Price charged per unit.
    ///
    /// A discounted line uses its unit price, or derives it from the
    /// original price. Otherwise the first of unit price and original price
    /// that is set, else zero.
    pub fn effective_unit_price(&self) -> Money {
        if self.discount_percent > 0 {
            return self.unit_price.unwrap_or_else(|| {
                self.original_price
                    .unwrap_or_default()
                    .percent_off(self.discount_percent)
            });
        }
        self.unit_price.or(self.original_price).unwrap_or_default()
    }

    pub fn line_total(&self) -> Money {
        self.effective_unit_price().multiply(self.quantity)
    }

    fn matches(&self, product_id: &str, variant_id: Option<&str>) -> bool {
        self.product_id.as_str() == product_id
            && self.variant_id.as_ref().map(VariantId::as_str) == variant_id
    }
}

/// Read and clear access to a cart, whoever owns it.
pub trait CartAccess {
    fn lines(&self) -> &[CartItem];
    fn clear(&mut self);
}

/// Ordered list of cart lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a cart from stored lines, merging duplicate keys and dropping
    /// empty lines.
    pub fn from_items(items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut cart = Cart::new();
        for item in items {
            if item.quantity == 0 {
                continue;
            }
            let existing = cart.items.iter_mut().find(|line| {
                line.matches(
                    item.product_id.as_str(),
                    item.variant_id.as_ref().map(VariantId::as_str),
                )
            });
            match existing {
                Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
                None => cart.items.push(item),
            }
        }
        cart
    }

    /// Adds one unit. Stock is not checked here.
    pub fn add_item(&mut self, product: &Product, variant: Option<&Variant>) {
        let variant_id = variant.map(|v| v.id.as_str());
        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.matches(product.id.as_str(), variant_id))
        {
            line.quantity = line.quantity.saturating_add(1);
            return;
        }
        self.items.push(CartItem::from_catalog(product, variant));
    }

    /// Sets the quantity of a line; zero or less removes it.
    ///
    /// Not clamped against `available_stock`.
    pub fn update_quantity(
        &mut self,
        product_id: &str,
        variant_id: Option<&str>,
        quantity: i64,
    ) -> Result<(), CartError> {
        let index = self
            .position(product_id, variant_id)
            .ok_or_else(|| not_found(product_id, variant_id))?;

        let quantity = u32::try_from(quantity.max(0)).unwrap_or(u32::MAX);
        if quantity == 0 {
            self.items.remove(index);
        } else {
            self.items[index].quantity = quantity;
        }
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str, variant_id: Option<&str>) -> Result<(), CartError> {
        let index = self
            .position(product_id, variant_id)
            .ok_or_else(|| not_found(product_id, variant_id))?;
        self.items.remove(index);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_units(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |units, item| units.saturating_add(item.quantity))
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    fn position(&self, product_id: &str, variant_id: Option<&str>) -> Option<usize> {
        self.items
            .iter()
            .position(|line| line.matches(product_id, variant_id))
    }
}

impl CartAccess for Cart {
    fn lines(&self) -> &[CartItem] {
        self.items()
    }

    fn clear(&mut self) {
        Cart::clear(self);
    }
}

fn not_found(product_id: &str, variant_id: Option<&str>) -> CartError {
    CartError::ItemNotFound {
        product_id: product_id.to_string(),
        variant_id: variant_id.map(str::to_string),
    }
}
