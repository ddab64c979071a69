//! Command handlers, one module per dashboard screen.

pub(crate) mod auth;
pub(crate) mod profile;
pub(crate) mod summary;
pub(crate) mod videos;
