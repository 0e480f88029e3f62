//! pagefaves — embeddable page-favourites core.
//!
//! The library behind a "heart this page" widget: a hybrid key-value store
//! with cross-tab change propagation, a validated bookmark state manager,
//! and an optional server sync client. Presentation (hearts, overlays,
//! hotkeys) is the embedder's job; this crate only owns the data.
//!
//! This crate exposes all modules for use by embedders and integration tests.

pub mod app;
pub mod managers;
pub mod platform;
pub mod services;
pub mod store;
pub mod types;
