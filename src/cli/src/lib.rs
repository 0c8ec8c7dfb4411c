//! Plugin Pull CLI - fetch WebAssembly plugins from OCI registries.

pub mod commands;
pub mod output;
