//! # Wirebus Core Types
//!
//! Runtime type model shared by the codec and the dispatcher.
//!
//! ## Design Philosophy
//!
//! - **Presence over value**: a [`Fingerprint`] records which fields were
//!   explicitly assigned, so "unset" and "set to the default" stay distinct
//! - **No reflection**: a static [`TypeTag`] chain gives every message type a
//!   position in a single-inheritance lattice plus the bit offsets of its fields
//! - **One bitset, two uses**: the dispatcher's partial matching and the
//!   codec's partial encoding are the same subset test on the same bits
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{Fingerprint, TypeTag};
//!
//! const ORDER: &TypeTag = &TypeTag::root(10, "Order", 2);
//! const LIMIT: &TypeTag = &TypeTag::derived(11, "LimitOrder", ORDER, 1);
//!
//! let mut pattern = Fingerprint::new(ORDER.field_count());
//! pattern.touch(ORDER.offset() + 1).unwrap();
//!
//! let mut message = Fingerprint::new(LIMIT.field_count());
//! message.touch(ORDER.offset() + 1).unwrap();
//! message.touch(LIMIT.offset()).unwrap();
//!
//! assert!(pattern.equivalent(&message));
//! assert!(!message.equivalent(&pattern));
//! ```

pub mod errors;
pub mod fingerprint;
pub mod tag;

pub use errors::{FingerprintError, TagError};
pub use fingerprint::Fingerprint;
pub use tag::{Chain, TypeTag};
