//! Common types, protocol definitions, and errors shared across the envelope codec crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
pub use protocol::Envelope;
