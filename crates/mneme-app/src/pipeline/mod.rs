//! Pure transformations applied to snapshot payloads.
//!
//! Modules under this namespace must remain free of IO and external side
//! effects so they can be reused across batch orchestrators and test
//! harnesses.

pub mod extract;

pub use extract::{extract_source_url, extract_title, fallback_source_url};
