//! Input filtering between the user's terminal and the child.
//!
//! - `classifier`: focus-event detection over the raw input byte stream
//! - `timer`: the escape window that releases a stalled prefix

mod classifier;
mod timer;

pub use classifier::{Classifier, Event};
pub use timer::{EscapeTimer, ESCAPE_TIMEOUT};
