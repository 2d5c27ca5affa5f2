use actix_web::HttpResponse;

/// `GET /health_check`
///
/// Used by the load balancer; always 200 with an empty body.
pub async fn health_check() -> HttpResponse { HttpResponse::Ok().finish() }
