pub mod errors;
pub mod hashing;
pub mod metrics;
pub mod test_utils;
pub mod validators;
pub mod whatsapp;
