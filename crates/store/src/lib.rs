//! Document-collection persistence abstractions.
//!
//! Every entity lives in a [`Collection`] keyed by its typed id. The one
//! primitive that matters for correctness is [`Collection::update`]: an
//! atomic check-and-mutate against a single document. Stock reservation and
//! coupon redemption counting are built exclusively on it; a read followed by
//! a separate write is not safe under concurrent requests and is not offered.

pub mod collection;
pub mod error;
pub mod memory;
pub mod sequence;

pub use collection::{Collection, UpdateError};
pub use error::StoreError;
pub use memory::InMemoryCollection;
pub use sequence::{InMemorySequences, SequenceProvider};
