//! Configuration validation
//!
//! Each section implements [`Validate`] and reports the first problem it
//! finds as a plain message.

mod config_validators;
mod trait_def;

pub use trait_def::Validate;
