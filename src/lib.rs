pub mod config;
pub mod error;
pub mod hocr;
pub mod layout;
pub mod pdf;
pub mod pipeline;
pub mod raster;
pub mod render;
