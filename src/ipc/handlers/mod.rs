pub mod backup;
pub mod core;
pub mod ranking;
pub mod registry;
pub mod results;
pub mod setup;
pub mod summary;
