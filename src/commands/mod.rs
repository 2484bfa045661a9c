pub mod inspect;
pub mod run;

// Re-export command functions for convenience
pub use inspect::{check_url, decide};
pub use run::run;
