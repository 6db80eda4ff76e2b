pub mod app_state;
pub mod auth;
pub mod chat_group_api;
pub mod chat_sync;
pub mod config;
pub mod emitter;
pub mod entity_store;
pub mod error;
pub mod file_ingest;
pub mod models;
pub mod project_api;
pub mod project_lifecycle;
pub mod task_api;
pub mod user_api;
pub mod web_socket_server;
