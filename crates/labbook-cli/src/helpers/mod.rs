//! Helper functions shared by command handlers.

pub mod input;
pub mod parsing;

pub use input::{confirm_or_force, read_body, read_file};
pub use parsing::parse_json_object;
