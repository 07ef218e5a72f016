pub mod commands;
pub mod panel;
