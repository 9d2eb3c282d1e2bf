pub mod book;
pub mod cli_args;
pub mod error;
mod extractor;
mod middleware;
pub mod repository;
mod route;
pub mod schema;
pub mod server;
mod state;

pub use state::ApiState;
