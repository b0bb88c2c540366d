//! Cloner placement coordinator and desktop glue
//!
//! The binary in `main.rs` is a thin shell over this library so the
//! placement flow can be exercised from tests.

pub mod coordinator;
pub mod desktop;
pub mod util;

pub use coordinator::{Browser, Coordinator, PlaceError, UrlOpener};
