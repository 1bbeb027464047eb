//! Action primitives implementation
//!
//! Primitives shared by every browser tool:
//! 1. click - native click plus a synthesized mouse event
//! 2. type_text - set a field value and fire input/change
//! 3. range - set a slider value and fire input/change
//! 4. scroll - move the viewport by a clamped offset
//! 5. navigate - load a new URL
//! 6. highlight - transient outline for operator feedback

mod click;
mod highlight;
mod navigate;
mod range;
mod scroll;
mod type_text;

pub use click::*;
pub use highlight::*;
pub use navigate::*;
pub use range::*;
pub use scroll::*;
pub use type_text::*;
