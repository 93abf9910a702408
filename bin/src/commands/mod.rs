//! CLI command implementations.

pub(crate) mod get;
pub(crate) mod once;
pub(crate) mod plan;
pub(crate) mod run;
pub(crate) mod status;
