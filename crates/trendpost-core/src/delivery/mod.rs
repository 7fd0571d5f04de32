mod mailer;

pub use mailer::Mailer;
