#![forbid(unsafe_code)]

mod definitions;
mod dispatch;

pub(crate) use definitions::tool_definitions;
pub(crate) use dispatch::dispatch_tool;
