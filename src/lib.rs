//! sonata: a headless music library and playback engine.

pub mod audio;
pub mod config;
pub mod error;
pub mod library;
pub mod runtime;
