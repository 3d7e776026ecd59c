pub mod config;
pub mod dispatch;
pub mod errors;
pub mod logging;
pub mod phase;
pub mod resume;
pub mod state;
pub mod tracker;
pub mod ui;
