pub mod icons;
pub mod status;

pub use status::{format_duration, render_status};
