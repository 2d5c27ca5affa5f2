use actix_web::http::header::ACCEPT_LANGUAGE;
use actix_web::web;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use serde::Deserialize;

use crate::domain::SignupLanguage;
use crate::email_client::EmailDispatcher;
use crate::fxa::IdentityRevoker;
use crate::store::SubscriberStore;
use crate::workflow::SignupContext;
use crate::workflow::SubscriberError;
use crate::workflow::SubscriberWorkflow;

#[derive(Deserialize)]
pub struct AddFormData {
    email: String,
    /// Newsletter checkbox; browsers send `on` when ticked and omit it otherwise
    #[serde(rename = "additionalEmails", default)]
    additional_emails: Option<String>,
}

/// `POST /user/add`
///
/// ```sh
///     curl -v --data 'email=john@foo.com' -H 'Accept-Language: en-US,en;q=0.5' \
///         http://127.0.0.1:8000/user/add
/// ```
///
/// 200 with an empty body on success: the response says nothing about whether
/// the address was already known. A missing `email` field is rejected by the
/// `Form` extractor (400) before reaching the workflow.
#[tracing::instrument(name = "POST /user/add", skip_all)]
pub async fn add<S, E, R>(
    form: web::Form<AddFormData>,
    request: HttpRequest,
    workflow: web::Data<SubscriberWorkflow<S, E, R>>,
) -> Result<HttpResponse, SubscriberError>
where
    S: SubscriberStore,
    E: EmailDispatcher,
    R: IdentityRevoker,
{
    let accept_language = request.headers().get(ACCEPT_LANGUAGE);
    if accept_language.is_some_and(|v| v.to_str().is_err()) {
        tracing::debug!("Accept-Language is not visible ASCII, decoding lossily");
    }
    let ctx = SignupContext {
        signup_language: SignupLanguage::from_header_bytes(
            accept_language.map(|v| v.as_bytes()),
        ),
    };
    let AddFormData {
        email,
        additional_emails,
    } = form.into_inner();

    workflow
        .add(email, additional_emails.as_deref() == Some("on"), &ctx)
        .await?;
    Ok(HttpResponse::Ok().finish())
}
