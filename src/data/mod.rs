pub mod store;

pub use store::{AccountSnapshot, SnapshotStore, SystemSnapshot};

#[cfg(test)]
mod store_tests;
