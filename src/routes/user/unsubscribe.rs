use actix_web::web;
use actix_web::HttpResponse;
use serde::Deserialize;

use super::html_page;
use crate::email_client::EmailDispatcher;
use crate::fxa::IdentityRevoker;
use crate::store::SubscriberStore;
use crate::utils::redirect;
use crate::workflow::SubscriberError;
use crate::workflow::SubscriberWorkflow;

#[derive(Deserialize)]
pub struct UnsubscribeParams {
    token: String,
    hash: String,
}

#[derive(Deserialize)]
pub struct UnsubscribeFormData {
    token: String,
    #[serde(rename = "emailHash")]
    email_hash: String,
}

/// `GET /user/unsubscribe?token=...&hash=...`
///
/// Link target from every email. Renders a confirmation form and changes
/// nothing; the actual unsubscribe is the `POST`, so link prefetchers cannot
/// unsubscribe anyone.
#[tracing::instrument(name = "GET /user/unsubscribe", skip_all)]
pub async fn unsubscribe_form<S, E, R>(
    params: web::Query<UnsubscribeParams>,
    workflow: web::Data<SubscriberWorkflow<S, E, R>>,
) -> Result<HttpResponse, SubscriberError>
where
    S: SubscriberStore,
    E: EmailDispatcher,
    R: IdentityRevoker,
{
    let subscriber = workflow
        .get_unsubscribe(&params.token, &params.hash)
        .await?;

    // values come from the stored record, not the query string
    let body = format!(
        r#"<p>Stop receiving breach alerts?</p>
    <form action="/user/unsubscribe" method="post">
      <input type="hidden" name="token" value="{}" />
      <input type="hidden" name="emailHash" value="{}" />
      <button type="submit">Unsubscribe</button>
    </form>"#,
        htmlescape::encode_attribute(subscriber.verification_token.as_ref()),
        htmlescape::encode_attribute(subscriber.email_hash.as_ref()),
    );
    Ok(html_page("Unsubscribe", &body))
}

/// `POST /user/unsubscribe`
///
/// On success, 302 to the survey page.
#[tracing::instrument(name = "POST /user/unsubscribe", skip_all)]
pub async fn unsubscribe<S, E, R>(
    form: web::Form<UnsubscribeFormData>,
    workflow: web::Data<SubscriberWorkflow<S, E, R>>,
) -> Result<HttpResponse, SubscriberError>
where
    S: SubscriberStore,
    E: EmailDispatcher,
    R: IdentityRevoker,
{
    workflow
        .post_unsubscribe(&form.token, &form.email_hash)
        .await?;
    Ok(redirect("/user/unsubscribe_survey"))
}

/// `GET /user/unsubscribe_survey`
pub async fn unsubscribe_survey() -> HttpResponse {
    html_page(
        "Unsubscribed",
        "<p>You have been unsubscribed and your data has been deleted.</p>\n    \
         <p>Mind telling us why you left? Reply to any of our emails.</p>",
    )
}
