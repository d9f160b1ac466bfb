#![forbid(unsafe_code)]

pub(crate) mod bootstrap;
pub(crate) mod inventory;
mod render;
pub(crate) mod statistics;
