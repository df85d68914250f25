//! Order model: the stored document, draft assembly and status handling.

mod document;
mod draft;
mod geolocation;
mod status;

pub use document::{
    Customer, OrderDocument, OrderLine, PaymentProof, PaymentSummary, ShippingAddress,
};
pub use draft::{CheckoutForm, OrderDraft, OrderDraftBuilder, PaymentChoice, ReceiptFile};
pub use geolocation::{Coordinates, GeoLocation, RawGeolocation};
pub use status::{OrderStatus, normalize_status};
