pub mod auth;
pub mod memory;
pub mod mongo;
pub mod repo;
pub mod routes;

pub use memory::MemoryRep;
pub use mongo::MongoRep;
pub use repo::{RecipeStore, RepoError, Repository, ShortLinkStore, UniqueKey};
