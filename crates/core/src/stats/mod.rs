#![forbid(unsafe_code)]

mod compose;
mod group;
mod scope;
mod snapshot;
mod truncate;

pub use compose::*;
pub use group::*;
pub use scope::*;
pub use snapshot::*;
pub use truncate::*;

#[cfg(test)]
mod tests;
