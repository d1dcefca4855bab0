//! Chrome-backed [`mapsift_crawler::Browser`] sessions.

mod config;
mod script;
mod session;

pub use config::ChromeConfig;
pub use session::{ChromeFactory, ChromeSession};
