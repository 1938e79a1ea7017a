//! Blacksmith Scout Browser Layer
//!
//! Everything that touches the web:
//! - Browser control interface and its Chrome implementation
//! - HTTP client construction for direct fetches
//! - Markup extraction (headlines, article bodies)
//! - Source repository crawling

pub mod browser;
pub mod chrome;
pub mod http;
pub mod html;
pub mod repository;

pub use browser::*;
pub use chrome::*;
pub use http::*;
pub use html::*;
pub use repository::*;
