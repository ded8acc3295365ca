pub mod database;
pub mod qdrant_config;
pub mod vector_db;

pub use database::{Database, DatabaseError};
pub use vector_db::{VectorDb, VectorDbError};
