pub mod base;
pub mod chat;
pub mod message;
pub mod user;

pub use chat::ChatDao;
pub use message::MessageDao;
pub use user::UserDao;
