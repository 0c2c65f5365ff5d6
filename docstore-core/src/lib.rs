pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod hierarchy;
pub mod model;
pub mod permission;
pub mod share;
pub mod store;
pub mod token;
