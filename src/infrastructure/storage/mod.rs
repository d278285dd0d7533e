//! Non-persistent repository provider used by tests and ephemeral runs

mod memory;

pub use memory::InMemoryRepositoryProvider;
