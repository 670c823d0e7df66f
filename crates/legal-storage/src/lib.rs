// Postgres storage layer with sqlx, plus a filesystem BlobStore.

pub mod blob;
pub mod store;

pub use blob::FilesystemBlobStore;
pub use store::Database;
