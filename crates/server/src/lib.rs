pub mod handlers;
pub mod server;
