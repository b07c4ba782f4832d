// Application layer - use cases and orchestration.
// Clients (CLI, importers) go through CustomerService; the pure engines in
// `domain` are called from here with a fresh snapshot each time.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;
