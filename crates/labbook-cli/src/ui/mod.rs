//! Terminal-aware output shared by every command.
//!
//! Commands build strings through [`render`] and never test for a TTY
//! themselves; [`UiContext`] carries that decision.

mod render;
mod terminal;
mod theme;

pub use render::{badge, kv, print, print_error, receipt, table, title};
pub use terminal::UiContext;
pub use theme::Badge;
