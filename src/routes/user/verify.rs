use actix_web::web;
use actix_web::HttpResponse;
use serde::Deserialize;

use super::html_page;
use crate::email_client::EmailDispatcher;
use crate::fxa::IdentityRevoker;
use crate::store::SubscriberStore;
use crate::workflow::SubscriberError;
use crate::workflow::SubscriberWorkflow;

#[derive(Deserialize)]
pub struct VerifyParams {
    token: String,
}

/// `GET /user/verify?token=...`
///
/// Target of the link in the verification email. Following the link twice is
/// harmless: the second visit sends nothing.
#[tracing::instrument(name = "GET /user/verify", skip_all)]
pub async fn verify<S, E, R>(
    params: web::Query<VerifyParams>,
    workflow: web::Data<SubscriberWorkflow<S, E, R>>,
) -> Result<HttpResponse, SubscriberError>
where
    S: SubscriberStore,
    E: EmailDispatcher,
    R: IdentityRevoker,
{
    workflow.verify(&params.token).await?;
    Ok(html_page(
        "Email verified",
        "<p>Your email address is verified. We will let you know if it shows up in a new \
         breach.</p>",
    ))
}
