pub mod config;
pub mod db;
pub mod layout;
pub mod load;
pub mod logging;
pub mod query;
pub mod report;
