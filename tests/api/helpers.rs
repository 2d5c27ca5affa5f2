use std::sync::Arc;

use breach_alerts::configuration::get_configuration;
use breach_alerts::configuration::DatabaseSettings;
use breach_alerts::domain::Subscriber;
use breach_alerts::startup::Application;
use breach_alerts::store::InMemorySubscriberStore;
use breach_alerts::telemetry::get_subscriber;
use breach_alerts::telemetry::init_subscriber;
use once_cell::sync::Lazy;
use reqwest::Url;
use sqlx::Connection;
use sqlx::Executor;
use sqlx::PgConnection;
use sqlx::PgPool;
use uuid::Uuid;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

/// Init the tracing subscriber once for the whole test binary.
///
/// To opt in to verbose logging, use the env var `TEST_LOG`:
///
/// ```sh
///      TEST_LOG=true cargo test [test_name] | bunyan
/// ```
static TRACING: Lazy<()> = Lazy::new(|| {
    // the two sinks have different types, hence the duplicated arms
    match std::env::var("TEST_LOG") {
        Ok(_) => {
            let subscriber = get_subscriber("test", "debug", std::io::stdout);
            init_subscriber(subscriber).unwrap();
        }
        Err(_) => {
            let subscriber = get_subscriber("test", "debug", std::io::sink);
            init_subscriber(subscriber).unwrap();
        }
    };
});

pub const TEST_LANGUAGE: &str = "en-US,en;q=0.5";

pub struct TestApp {
    pub addr: String,
    pub port: u16,
    /// Same store the app writes to
    pub store: Arc<InMemorySubscriberStore>,
    /// Mock email API
    pub email_server: MockServer,
    /// Mock FXA OAuth server
    pub fxa_server: MockServer,
    /// Does not follow redirects, so that 302s can be asserted on
    pub api_client: reqwest::Client,
}

/// Links carried by the template model of one dispatched email
pub struct EmailLinks {
    /// Only present in the verification email
    pub verify: Option<Url>,
    pub unsubscribe: Url,
}

impl TestApp {
    /// `POST /user/add` with a raw urlencoded body and the default
    /// `Accept-Language`
    pub async fn post_add(
        &self,
        body: &str,
    ) -> reqwest::Response {
        self.api_client
            .post(format!("{}/user/add", self.addr))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept-Language", TEST_LANGUAGE)
            .body(body.to_owned())
            .send()
            .await
            .expect("execute request")
    }

    pub async fn get_verify(
        &self,
        token: &str,
    ) -> reqwest::Response {
        self.api_client
            .get(format!("{}/user/verify", self.addr))
            .query(&[("token", token)])
            .send()
            .await
            .expect("execute request")
    }

    pub async fn get_unsubscribe(
        &self,
        token: &str,
        hash: &str,
    ) -> reqwest::Response {
        self.api_client
            .get(format!("{}/user/unsubscribe", self.addr))
            .query(&[("token", token), ("hash", hash)])
            .send()
            .await
            .expect("execute request")
    }

    pub async fn post_unsubscribe(
        &self,
        token: &str,
        hash: &str,
    ) -> reqwest::Response {
        let body = serde_urlencoded::to_string([("token", token), ("emailHash", hash)]).unwrap();
        self.api_client
            .post(format!("{}/user/unsubscribe", self.addr))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .expect("execute request")
    }

    /// Mount a catch-all 200 on the mock email API
    pub async fn accept_emails(&self) {
        Mock::given(path("/email/withTemplate"))
            .and(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.email_server)
            .await;
    }

    /// Sign up `email` through the API and return the stored record.
    /// Requires `accept_emails`.
    pub async fn signed_up(
        &self,
        email: &str,
    ) -> Subscriber {
        let body = serde_urlencoded::to_string([("email", email)]).unwrap();
        self.post_add(&body)
            .await
            .error_for_status()
            .unwrap();
        self.subscriber(email).expect("subscriber was stored")
    }

    /// Stored record for `email` (case-insensitive), if any
    pub fn subscriber(
        &self,
        email: &str,
    ) -> Option<Subscriber> {
        self.store
            .subscribers()
            .unwrap()
            .into_iter()
            .find(|s| s.email.as_ref().eq_ignore_ascii_case(email))
    }

    pub async fn email_requests(&self) -> Vec<wiremock::Request> {
        self.email_server.received_requests().await.unwrap()
    }

    /// Extract the links from an email request's template model, pointed at
    /// the test server's port.
    pub fn get_links(
        &self,
        email_request: &wiremock::Request,
    ) -> EmailLinks {
        let json_body: serde_json::Value = serde_json::from_slice(&email_request.body).unwrap();
        let model = &json_body["TemplateModel"];

        let get_link = |s: &str| {
            let links: Vec<_> = linkify::LinkFinder::new()
                .links(s)
                .filter(|l| *l.kind() == linkify::LinkKind::Url)
                .collect();
            assert_eq!(links.len(), 1);
            let mut link = Url::parse(links[0].as_str()).unwrap();
            // don't want to accidentally call some random url
            assert_eq!(link.host_str().unwrap(), "127.0.0.1");
            link.set_port(Some(self.port)).unwrap();
            link
        };

        EmailLinks {
            verify: model["verify_url"].as_str().map(get_link),
            unsubscribe: get_link(model["unsubscribe_url"].as_str().unwrap()),
        }
    }
}

/// Spawn the app on a random port, backed by an in-memory store and mock
/// email/FXA servers.
pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let email_server = MockServer::start().await;
    let fxa_server = MockServer::start().await;

    let cfg = {
        let mut cfg = get_configuration().unwrap();
        // port 0: the OS picks a free port, retrieved via `get_port`
        cfg.application.port = 0;
        cfg.application.host = "127.0.0.1".to_string();
        // links in emails point here (the port is patched in by `get_links`)
        cfg.application.base_url = "http://127.0.0.1".to_string();
        cfg.email_client.base_url = email_server.uri();
        cfg.fxa.oauth_origin = fxa_server.uri();
        cfg
    };

    let store = Arc::new(InMemorySubscriberStore::new());
    let app = Application::build_with_store(cfg, store.clone()).unwrap();
    let port = app.get_port();
    tokio::spawn(app.run_until_stopped());

    let api_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr: format!("http://127.0.0.1:{port}"),
        port,
        store,
        email_server,
        fxa_server,
        api_client,
    }
}

/// Read `DatabaseSettings` and create a db with a randomised name, with the
/// migrations in `migrations/` applied.
///
/// `None` if postgres cannot be reached with the `database` settings, so the
/// store tests skip instead of failing on machines without a database. Set
/// `TEST_REQUIRE_DB` to turn that into a failure (e.g. in CI).
pub async fn configure_database() -> Option<PgPool> {
    let mut cfg: DatabaseSettings = get_configuration().unwrap().database;
    cfg.database_name = Uuid::new_v4().to_string();

    let mut conn = match PgConnection::connect_with(&cfg.connection_without_db()).await {
        Ok(conn) => conn,
        Err(e) if std::env::var("TEST_REQUIRE_DB").is_err() => {
            eprintln!("skipping: postgres is not reachable ({e})");
            return None;
        }
        Err(e) => panic!("postgres must be running: {e}"),
    };
    conn.execute(format!(r#"CREATE DATABASE "{}";"#, cfg.database_name).as_str())
        .await
        .unwrap();

    let pool = PgPool::connect_with(cfg.connection()).await.unwrap();
    sqlx::migrate!().run(&pool).await.expect("failed to migrate");
    Some(pool)
}
