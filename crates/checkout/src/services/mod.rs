//! External service traits and in-memory implementations used by checkout.

pub mod uploads;

pub use uploads::{InMemoryUploadService, UploadError, UploadService, UploadedFile};
