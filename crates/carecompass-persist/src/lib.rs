pub mod error;
pub mod memory;
pub mod trait_client;

pub use error::{PersistError, Result};
pub use memory::InMemoryPersistence;
pub use trait_client::PersistenceClient;
