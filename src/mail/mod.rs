//! Mailbox side of the reply pipeline: body extraction, reply composition,
//! the provider abstraction and its Gmail implementation, and the gateway.

pub mod compose;
pub mod extract;
pub mod gateway;
pub mod gmail;
pub mod provider;
pub mod types;

pub use gateway::{MailboxGateway, SentReply};
pub use gmail::GmailProvider;
pub use provider::MailboxProvider;
pub use types::*;
