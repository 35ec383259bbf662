pub mod core;
pub mod dashboard;
pub mod results;
pub mod schools;
