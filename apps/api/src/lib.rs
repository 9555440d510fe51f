pub mod analysis;
pub mod config;
pub mod cv;
pub mod errors;
pub mod extraction;
pub mod llm_client;
pub mod models;
pub mod routes;
pub mod state;

#[cfg(test)]
mod testing;
