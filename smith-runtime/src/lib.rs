//! Blacksmith Scout Runtime
//!
//! Runs the bounded browsing loop: one [`Scraper`] per task, one browser per
//! scraper, with [`RunSettings`] for the knobs and a [`ProgressHandle`] for
//! hosts that poll while a run is in flight.

pub mod settings;
pub mod progress;
pub mod scraper;

pub use settings::*;
pub use progress::*;
pub use scraper::*;
