pub mod commands;
pub mod feed;
