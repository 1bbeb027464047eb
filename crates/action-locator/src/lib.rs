//! Element location with an ordered fallback chain
//!
//! Each lookup walks three strategies and stops at the first visible match:
//! - structural selectors written for the site
//! - generic attribute-pattern selectors derived from a free-text target
//! - free-text matching over clickable elements
//!
//! The per-action selector lists live in [`LocatorCatalog`] and can be overridden from config.

pub mod catalog;
pub mod errors;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use catalog::*;
pub use errors::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
