pub mod adapters;
pub mod config;
pub mod content;
pub mod error;
pub mod panel;
pub mod relay;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;
