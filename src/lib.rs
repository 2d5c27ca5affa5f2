pub mod configuration;
pub mod domain;
pub mod email_client;
pub mod fxa;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod utils;
pub mod workflow;
