// Shared building blocks: logger first so its macros are visible everywhere
#[macro_use]
pub mod logger;

pub mod constants;
pub mod utils;
