pub mod mailer;
pub mod policy;
pub mod render;

pub use mailer::{Mailer, SmtpMailer, SmtpSettings};
pub use policy::{Notification, Recipients, decide};
