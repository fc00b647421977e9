//! Core value types shared by every ambience subsystem

pub mod listener;
pub mod range;

pub use listener::{horizontal_distance, ListenerSource, SharedListener};
pub use range::FloatRange;
