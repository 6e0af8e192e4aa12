pub mod app;
pub mod assets;
pub mod batch;
pub mod capability;
pub mod config;
pub mod context;
pub mod convert;
pub mod demos;
pub mod effect;
pub mod error;
pub mod image;
pub mod loader;
pub mod music;
pub mod palette;
pub mod presenter;
pub mod render;
pub mod stats;
pub mod surface;
pub mod terminal;
pub mod time_cursor;
pub mod timer;
