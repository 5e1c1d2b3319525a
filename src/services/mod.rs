// Service exports
pub mod engine;
pub mod memory;
pub mod postgres;
pub mod scheduler;
pub mod store;

pub use engine::{MatchingEngine, RefreshReport, RefreshFailure};
pub use memory::{MemoryStore, SeedData};
pub use postgres::PostgresClient;
pub use store::{MatchStore, MatchFilter, NewProject, StoreError};
