//! Outbound integrations: AI content generation, mail delivery and NATS events.

pub mod ai;
pub mod events;
pub mod mailer;

pub use ai::{ContentGenerator, GeneratedEmail, HttpContentGenerator};
pub use events::EventBus;
pub use mailer::{HttpMailer, LogMailer, Mailer, OutgoingEmail};
