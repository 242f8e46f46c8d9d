pub mod arm;
pub mod camera;
pub mod config;
pub mod control;
pub mod pose;
pub mod render;
pub mod servo;
