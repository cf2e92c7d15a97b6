//! CLI command implementations

pub(crate) mod common;
pub(crate) mod info;
pub(crate) mod load;
pub(crate) mod migrate;
pub(crate) mod plan;
pub(crate) mod sample;
pub(crate) mod transform;
pub(crate) mod validate;
pub(crate) mod verify;
