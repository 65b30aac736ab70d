mod database;
pub mod error;
mod files;
mod messages;
mod migration;
pub mod models;
pub mod sessions;
pub mod store;
mod util;

pub use error::{Error, Result};
pub use files::Files;
pub use messages::Messages;
pub use models::{
    CreateMessageInput, CreateSessionInput, File, FinishReason, Message, Part, Role, Session,
    UsageDelta,
};
pub use sessions::Sessions;
pub use store::Store;
