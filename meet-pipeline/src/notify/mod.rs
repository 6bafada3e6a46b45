pub mod chat;
pub mod consent;
pub mod webhook;

pub use chat::{ChatClient, HttpChatClient};
pub use webhook::deliver_webhook;
