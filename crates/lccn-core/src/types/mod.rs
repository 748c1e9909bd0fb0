//! Core types for LCCN

mod event;
mod filter;
mod subscription;
pub mod vocabulary;

pub use event::*;
pub use filter::*;
pub use subscription::*;
