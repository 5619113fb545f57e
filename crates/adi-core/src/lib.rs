pub mod config;
pub mod dates;
pub mod error;
pub mod importer;
pub mod logging;
pub mod record;
pub mod secrets;
pub mod staging;
pub mod trigger;
