pub mod config;
pub mod timer;
pub mod widget;
