//! Data models for the index and the per-rule policies it references.

pub mod index;
pub mod policy;
