pub mod repo;

pub use repo::{SqliteRepo, connect};
