//! Action primitives - DOM operations the executor composes into tool actions
//!
//! This crate provides the building blocks every browser tool shares:
//! - `PageDom`, the capability through which the page is queried and mutated
//! - the visibility rule used when choosing among matches
//! - click, type, range, scroll, navigate and highlight primitives
//! - fixed settle delays between acting and observing

pub mod dom;
pub mod errors;
mod primitives;
pub mod types;
mod waiting;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use dom::*;
pub use errors::*;
pub use primitives::*;
pub use types::*;
pub use waiting::*;
