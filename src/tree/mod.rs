//! The in-memory configuration tree.
//!
//! A tree is a [`Node`] holding [`Value`]s. Everything here is synchronous
//! and owns its data; concurrency lives in [`crate::config`].

pub mod codec;
pub mod node;
pub mod number;
pub mod path;
pub mod value;

pub use node::ChangeSet;
pub use number::Number;
pub use value::{Node, Value};
