// Copyright 2025 Cowboy AI, LLC.

//! State values and copy-on-write drafts

mod draft;
mod value;

pub use draft::{produce, Draft};
pub use value::{Map, Value};
