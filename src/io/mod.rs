// Process plumbing around the controller
pub mod control; // Operator command file + SIGUSR1
pub mod gateway; // Timeout-bounded worker calls
pub mod lock; // Single-instance lock file
pub mod signals; // Unix signal handling
pub mod snapshot; // Status file for `growlight status`
