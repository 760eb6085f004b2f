//! Commands Layer
//!
//! Handlers that bridge the view layer to the reconciler and repository.

mod item_cmd;

pub use item_cmd::*;
