mod health_check;
mod user;

pub use health_check::*;
pub use user::*;
