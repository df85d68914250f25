//! Domain layer for the storefront order subsystem.
//!
//! This crate provides:
//! - the cart aggregate and its snapshot persistence
//! - the catalog model and the line-item product resolver
//! - the order document, the draft builder and status normalization

pub mod cart;
pub mod catalog;
pub mod collections;
pub mod error;
pub mod lenient;
pub mod order;
pub mod value_objects;

pub use cart::{
    CART_SNAPSHOT_KEY, Cart, CartAccess, CartItem, CartSession, CartSnapshotStore,
    FileSnapshotStore, MemorySnapshotStore,
};
pub use catalog::{CatalogSnapshot, LineItemProductResolver, MatchKind, Product, ResolvedProduct, Variant};
pub use error::{CartError, ValidationError};
pub use lenient::read_stock;
pub use order::{
    CheckoutForm, Customer, GeoLocation, OrderDocument, OrderDraft, OrderDraftBuilder, OrderLine,
    OrderStatus, PaymentChoice, PaymentProof, PaymentSummary, RawGeolocation, ReceiptFile,
    ShippingAddress, normalize_status,
};
pub use value_objects::{Money, ProductId, VariantId};
