//! Outbound service clients behind traits, so handlers can be exercised
//! without a live storage account or cache.

pub mod blob;
pub mod kv;
