//! Client directory adapters.

mod in_memory;

pub use in_memory::{InMemoryClientDirectory, SeedError};
