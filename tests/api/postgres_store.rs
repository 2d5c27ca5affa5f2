//! `PgSubscriberStore` against a real database, one fresh db per test.
//!
//! Each test returns early when postgres is unreachable; run with
//! `TEST_REQUIRE_DB=1` to make that a failure instead.

use breach_alerts::domain::NewSubscriber;
use breach_alerts::domain::SignupLanguage;
use breach_alerts::domain::SubscriberEmail;
use breach_alerts::store::PgSubscriberStore;
use breach_alerts::store::SubscriberStore;
use breach_alerts::store::Verification;
use claims::assert_none;
use claims::assert_some;

use crate::helpers::configure_database;

fn signup(
    email: &str,
    lang: &str,
) -> NewSubscriber {
    NewSubscriber::new(
        SubscriberEmail::parse(email.to_string()).unwrap(),
        SignupLanguage::from_header(Some(lang)),
        false,
    )
}

#[tokio::test]
async fn upsert_converges_on_one_row() {
    let Some(pool) = configure_database().await else {
        return;
    };
    let store = PgSubscriberStore::new(pool);

    let first = store.upsert(&signup("john@foo.com", "en")).await.unwrap();
    let second = store.upsert(&signup("JOHN@foo.com", "de")).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.verification_token, second.verification_token);
    assert_eq!(second.signup_language.as_ref(), "de");
    assert!(!second.verified);

    let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM subscribers")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn verified_row_survives_upsert() {
    let Some(pool) = configure_database().await else {
        return;
    };
    let store = PgSubscriberStore::new(pool);

    let added = store.upsert(&signup("john@foo.com", "en")).await.unwrap();
    let verified = assert_some!(store.mark_verified(&added.verification_token).await.unwrap());
    assert!(matches!(verified, Verification::Verified(ref s) if s.verified));

    let again = store.upsert(&signup("john@foo.com", "fr")).await.unwrap();
    assert!(again.verified);
    assert_eq!(again.signup_language.as_ref(), "en");

    let found = assert_some!(store
        .find_by_email(&SubscriberEmail::parse("john@foo.com".to_string()).unwrap())
        .await
        .unwrap());
    assert_eq!(found.id, added.id);
}

#[tokio::test]
async fn concurrent_verification_has_one_winner() {
    let Some(pool) = configure_database().await else {
        return;
    };
    let store = PgSubscriberStore::new(pool);
    let added = store.upsert(&signup("john@foo.com", "en")).await.unwrap();

    let (a, b) = tokio::join!(
        store.mark_verified(&added.verification_token),
        store.mark_verified(&added.verification_token),
    );
    let winners = [a.unwrap(), b.unwrap()]
        .into_iter()
        .filter(|v| matches!(v, Some(Verification::Verified(_))))
        .count();
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn delete_needs_token_and_hash() {
    let Some(pool) = configure_database().await else {
        return;
    };
    let store = PgSubscriberStore::new(pool);
    let john = store.upsert(&signup("john@foo.com", "en")).await.unwrap();
    let jane = store.upsert(&signup("jane@foo.com", "en")).await.unwrap();

    assert_none!(store
        .delete(&john.verification_token, &jane.email_hash)
        .await
        .unwrap());
    let deleted = assert_some!(store
        .delete(&john.verification_token, &john.email_hash)
        .await
        .unwrap());
    assert_eq!(deleted.id, john.id);
    assert_none!(store.find_by_token(&john.verification_token).await.unwrap());
    assert_some!(store.find_by_token(&jane.verification_token).await.unwrap());
}

#[tokio::test]
async fn old_pending_row_still_verifies() {
    let Some(pool) = configure_database().await else {
        return;
    };
    let store = PgSubscriberStore::new(pool);
    let added = store.upsert(&signup("old@foo.com", "en")).await.unwrap();
    sqlx::query("UPDATE subscribers SET created_at = now() - interval '73 hours'")
        .execute(store.pool())
        .await
        .unwrap();

    let verified = assert_some!(store.mark_verified(&added.verification_token).await.unwrap());
    assert!(matches!(verified, Verification::Verified(ref s) if s.id == added.id));
}
