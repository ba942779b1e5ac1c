//! Data model shared between the country directory core and its consumers.

pub mod domain;
pub mod error;
pub mod protocol;
