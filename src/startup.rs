use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::web;
use actix_web::App;
use actix_web::HttpServer;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_actix_web::TracingLogger;

use crate::configuration::DatabaseSettings;
use crate::configuration::Settings;
use crate::email_client::EmailClient;
use crate::email_client::EmailDispatcher;
use crate::fxa::FxaClient;
use crate::fxa::IdentityRevoker;
use crate::routes::add;
use crate::routes::health_check;
use crate::routes::unsubscribe;
use crate::routes::unsubscribe_form;
use crate::routes::unsubscribe_survey;
use crate::routes::verify;
use crate::store::PgSubscriberStore;
use crate::store::SubscriberStore;
use crate::workflow::SubscriberWorkflow;

/// The workflow as deployed: Postgres, the email API and FXA
pub type PgWorkflow = SubscriberWorkflow<PgSubscriberStore, EmailClient, FxaClient>;

/// Wrapper for actix's `Server` with access to the bound port. Not to be
/// confused with actix's `App`!
pub struct Application {
    /// Left private; use `get_port` to access
    port: u16,
    server: Server,
}

impl Application {
    /// Build the production app: a lazy Postgres pool behind
    /// `PgSubscriberStore`.
    pub async fn build(cfg: Settings) -> Result<Self, anyhow::Error> {
        // connect_lazy: db-free requests (health_check) work without postgres
        let pool = get_connection_pool(&cfg.database);
        Self::build_with_store(cfg, PgSubscriberStore::new(pool))
    }

    /// Same as `build`, but with any store. The email and FXA clients are
    /// still built from `cfg`.
    pub fn build_with_store<S: SubscriberStore>(
        cfg: Settings,
        store: S,
    ) -> Result<Self, anyhow::Error> {
        let addr = format!("{}:{}", cfg.application.host, cfg.application.port);
        let listener = TcpListener::bind(addr)?;
        // port 0 in config means "let the OS pick"; report what we actually got
        let port = listener.local_addr()?.port();

        let workflow = SubscriberWorkflow::new(
            store,
            cfg.email_client.client()?,
            cfg.fxa.client()?,
            cfg.application.base_url,
        );
        let server = run(listener, workflow)?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 { self.port }

    /// Because this consumes `self`, this should be the final function call (or
    /// passed to `tokio::spawn`)
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> { self.server.await }
}

pub fn get_connection_pool(db_cfg: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new().connect_lazy_with(db_cfg.connection())
}

/// The server is not responsible for binding to an address, it only listens to
/// an already bound address.
///
/// Declares all API endpoints.
pub fn run<S, E, R>(
    listener: TcpListener,
    workflow: SubscriberWorkflow<S, E, R>,
) -> Result<Server, anyhow::Error>
where
    S: SubscriberStore,
    E: EmailDispatcher,
    R: IdentityRevoker,
{
    // one workflow (store, http clients) shared by every worker's `App`
    let workflow = web::Data::new(workflow);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/user")
                    .route("/add", web::post().to(add::<S, E, R>))
                    .route("/verify", web::get().to(verify::<S, E, R>))
                    .route("/unsubscribe", web::get().to(unsubscribe_form::<S, E, R>))
                    .route("/unsubscribe", web::post().to(unsubscribe::<S, E, R>))
                    .route("/unsubscribe_survey", web::get().to(unsubscribe_survey)),
            )
            .app_data(workflow.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
