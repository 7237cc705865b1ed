pub mod common;

mod api_client;
mod session_sync;
