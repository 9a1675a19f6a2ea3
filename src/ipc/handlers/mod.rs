pub mod attendance;
pub mod catalog;
pub mod core;
pub mod grades;
pub mod groups;
pub mod locks;
pub mod reports;
pub mod setup;
pub mod students;
