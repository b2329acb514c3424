#[cfg(feature = "rustpotter")]
pub mod rustpotter_wrapper;

#[cfg(feature = "rustpotter")]
pub use rustpotter_wrapper::RustpotterEngine;
