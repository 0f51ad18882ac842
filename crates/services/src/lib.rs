pub mod auth;
pub mod chat;
pub mod dao;
pub mod storage;

pub use auth::AuthService;
pub use chat::ChatService;
pub use storage::{ObjectStore, UploadGateway};
