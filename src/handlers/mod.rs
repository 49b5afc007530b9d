// Handler modules
pub mod batch;
pub mod check;
pub mod rules;

// Re-export all handler functions
pub use batch::handle_batch;
pub use check::handle_check;
pub use rules::handle_rules;
