pub mod database;
pub mod documents;
pub mod error;
pub mod filter;
pub mod row_helpers;
pub mod schema;
pub mod subcategories;
pub mod tasks;

pub use database::Database;
pub use documents::{Cursor, DeleteAck, DocumentStore, InsertAck, UpdateAck};
pub use error::StoreError;
pub use filter::{Filter, Patch};
pub use subcategories::SubCategoryRepo;
pub use tasks::{TaskCollection, TaskRepo};
