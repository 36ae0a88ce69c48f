//! Push-based reactive streams for incremental style resolution.
//!
//! This crate provides the small observable layer the rule tree is built on:
//! - [`Stream`]: a cold, subscribable producer of values
//! - [`Subject`]: a hot value holder that pushes every update to its observers
//! - [`Subscription`]: RAII guard that detaches an observer when dropped
//! - Operators: [`Stream::map`], [`Stream::distinct_by`],
//!   [`Stream::combine_latest`], [`Stream::switch_map`]
//!
//! # Model
//!
//! Everything is single-threaded and synchronous:
//!
//! ```text
//! Subject::set(value)
//!     ↓  (same call stack)
//! operator chain (map / distinct / combine / switch)
//!     ↓
//! observer callback
//! ```
//!
//! Subscribing delivers the current value immediately when one exists, then
//! every later value in the order the mutations happened, until the
//! [`Subscription`] is dropped or the stream terminates with
//! [`Event::Failed`] or [`Event::Ended`]. Each subscription builds its own
//! operator chain, so there is no shared state between two readers of the
//! same stream.
//!
//! A value set from inside an observer is queued and delivered once the
//! current one has reached every observer. Joins wait for the outermost
//! delivery to finish before combining, so one update seen by both sides of a
//! [`Stream::combine_latest`] produces a single combined value.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use style_stream::{Event, Subject};
//!
//! let color = Subject::with_value("red".to_owned());
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! let _sub = color.stream().map(|value| value.len()).subscribe(move |event| {
//!     if let Event::Next(len) = event {
//!         sink.borrow_mut().push(len);
//!     }
//! });
//! color.set("blue".to_owned());
//! assert_eq!(*seen.borrow(), vec![3, 4]);
//! ```

#![forbid(unsafe_code)]
#![allow(
    clippy::module_name_repetitions,
    reason = "Types like StreamError are clearer than just Error"
)]
#![allow(clippy::missing_errors_doc, reason = "Errors travel through events")]
#![allow(clippy::redundant_pub_crate, reason = "Crate-internal hooks are marked explicitly")]

mod batch;
mod error;
mod operators;
mod revision;
mod sink;
mod stream;
mod subject;
mod subscription;

// Re-exports
pub use error::StreamError;
pub use revision::{Revision, RevisionCounter};
pub use sink::{Event, Sink};
pub use stream::Stream;
pub use subject::Subject;
pub use subscription::Subscription;
