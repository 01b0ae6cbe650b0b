//! Filesystem mutation stage.

pub mod relink;

pub use relink::{RelinkOptions, RelinkStats, Relinker};
