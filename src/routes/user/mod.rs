//! `/user/*`: signup, verification and unsubscribe.
//!
//! Handlers only extract request data (form, query, headers) and hand it to
//! `SubscriberWorkflow`; they are generic over its collaborators so the same
//! routes serve the Postgres-backed app and the in-memory one.

mod add;
mod unsubscribe;
mod verify;

use actix_web::body::BoxBody;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use actix_web::ResponseError;
pub use add::*;
pub use unsubscribe::*;
pub use verify::*;

use crate::workflow::SubscriberError;

impl ResponseError for SubscriberError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidEmail(_) => StatusCode::BAD_REQUEST,
            Self::NotSubscribed => StatusCode::UNAUTHORIZED,
            Self::DispatchFailure(_) | Self::UnexpectedError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    // client errors explain themselves; server errors stay opaque (the cause
    // chain is logged by `TracingLogger`)
    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            Self::InvalidEmail(_) | Self::NotSubscribed => HttpResponse::build(self.status_code())
                .content_type(ContentType::plaintext())
                .body(self.to_string()),
            _ => HttpResponse::new(self.status_code()),
        }
    }
}

/// Minimal HTML page; `body` must already be escaped.
fn html_page(
    title: &str,
    body: &str,
) -> HttpResponse {
    HttpResponse::Ok().content_type(ContentType::html()).body(format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta http-equiv="content-type" content="text/html; charset=utf-8" />
    <title>{title}</title>
  </head>
  <body>
    {body}
  </body>
</html>
"#
    ))
}
