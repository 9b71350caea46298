pub mod controller;
pub mod matcher;

pub use controller::StatusController;
pub use matcher::match_thresholds;
