pub mod app;
pub mod attendance;
pub mod classroom;
pub mod cli;
pub mod config;
pub mod data;
pub mod face;
pub mod forms;
pub mod logging;
pub mod state;
pub mod tutor;
pub mod utils;
pub mod web;
