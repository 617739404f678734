//! External integrations

pub mod assistant;
pub mod mailer;

pub use assistant::AssistantClient;
pub use mailer::{Mailer, OutgoingMail};
