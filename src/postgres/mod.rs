// ABOUTME: PostgreSQL connection module
// ABOUTME: Exports connection utilities for source and target hosts

pub mod connection;

pub use connection::connect;
