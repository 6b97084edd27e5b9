pub mod api_error;
pub mod files;
pub mod tasks;
pub mod websocket;
