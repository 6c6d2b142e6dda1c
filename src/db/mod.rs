//! Persistence for users and refresh tokens
//!
//! - `store`: the `AuthStore` contract and an in-process implementation
//! - `mongo`: MongoDB client and typed collections
//! - `mongo_store`: `AuthStore` over MongoDB

pub mod mongo;
pub mod mongo_store;
pub mod schemas;
pub mod store;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};
pub use mongo_store::MongoStore;
pub use store::{AuthStore, MemoryStore, NewUser, User};
