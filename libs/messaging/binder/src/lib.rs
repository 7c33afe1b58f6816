//! # Wirebus Binder
//!
//! ## Purpose
//!
//! Resolves a message to the ordered chain of handlers bound to patterns it
//! satisfies. A pattern is an ordinary message instance: its type, the
//! fields it touched and their values. Untouched fields are wildcards.
//!
//! ## Integration Points
//!
//! - **Execution contexts**: call [`Binder::build_handler_chain`] (or
//!   [`Binder::dispatch`]) for each dequeued message
//! - **Components**: hold a [`BindingScope`] and detach it at teardown
//! - **Codec**: patterns and messages are [`codec::Cell`] values
//!
//! ## Quick Start
//!
//! ```rust
//! use binder::Binder;
//! use codec::Event;
//!
//! let binder = Binder::new();
//! let any = binder.bind_fn(&Event::new(), |_| {});
//! let alerts = binder.bind_fn(&Event::new().with_channel("alerts".into()), |_| {});
//!
//! let chain = binder.build_handler_chain(&Event::new().with_channel("alerts".into()));
//! assert_eq!(chain.ids(), vec![any.handler(), alerts.handler()]);
//!
//! let chain = binder.build_handler_chain(&Event::new().with_channel("fills".into()));
//! assert_eq!(chain.ids(), vec![any.handler()]);
//! ```

pub mod binder;
pub mod error;
pub mod handler;
pub mod scope;
mod slot;

pub use binder::{Binder, BindingToken};
pub use error::{BinderError, Result};
pub use handler::{Callback, Handler, HandlerChain, HandlerId, OwnerId};
pub use scope::BindingScope;
