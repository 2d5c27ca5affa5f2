mod helpers;
mod postgres_store;
