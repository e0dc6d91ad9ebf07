//! Activity time tracker for the terminal. Define activities, start and stop sessions against
//! them and look at how the hours add up over the last days, weeks or months.
//!
//! Everything is stored locally, see [storage] for the layout.

pub mod cli;
pub mod fs;
pub mod storage;
pub mod utils;
