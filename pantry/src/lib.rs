pub mod actor;
pub mod catalog;
pub mod error;
mod image;
pub mod membership;
pub mod memory;
pub mod models;
pub mod recipe;
pub mod shopping_list;
pub mod store;
pub mod users;

#[cfg(test)]
mod test_support;

pub use actor::Actor;
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use store::Store;
