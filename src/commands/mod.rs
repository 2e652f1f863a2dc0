// ABOUTME: Command implementations for the CLI
// ABOUTME: Exports sync and status commands

pub mod status;
pub mod sync;

pub use status::status;
pub use sync::sync;
