pub mod handlers;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod provider;
