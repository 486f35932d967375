// pushgate-mongodb: MongoDB document store adapter.
//
// Implements the core Adapter trait on the official MongoDB driver.
// Collections hold one document per record; the record `id` is stored as
// `_id`.

pub mod adapter;
pub mod query;

pub use adapter::MongoAdapter;
