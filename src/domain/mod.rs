mod email_hash;
mod new_subscriber;
mod signup_language;
mod subscriber;
mod subscriber_email;
mod verification_token;
// allow external `use` statements to skip `new_subscriber` etc
pub use email_hash::EmailHash;
pub use new_subscriber::NewSubscriber;
pub use signup_language::SignupLanguage;
pub use subscriber::Subscriber;
pub use subscriber_email::SubscriberEmail;
pub use verification_token::VerificationToken;
