// ABOUTME: Library module for pg-tablesync
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod postgres;
pub mod sync;
pub mod utils;
