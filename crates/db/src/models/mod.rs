pub mod chat;
pub mod message;
pub mod stored_file;
pub mod user;

pub use chat::*;
pub use message::*;
pub use stored_file::*;
pub use user::*;
