pub mod catalog_repo;
pub mod inventory;
pub mod memory;
pub mod models;
pub mod order_repo;
#[cfg(test)]
mod test_db;

pub use memory::InMemoryStore;
pub use order_repo::DieselStore;
