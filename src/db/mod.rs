pub mod accounts;
pub mod schema;
pub mod store;
