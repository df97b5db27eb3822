// meridian_core/src/lib.rs

// This file defines the public modules of the library.
pub mod errors;
pub mod lie;
pub mod models;
pub mod prelude;
pub mod states;
pub mod types;
pub mod utils;
