pub mod auth;
pub mod leads;
pub mod llm;
pub mod messages;
pub mod store;
