use actix_web::http::header::LOCATION;
use actix_web::HttpResponse;

/// Write `e` followed by every error in its `source` chain, one per line.
/// Used as the `Debug` impl of request-boundary errors, so that logs carry the
/// root cause and not just the outermost message.
pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{e}\n")?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{cause}")?;
        current = cause.source();
    }
    Ok(())
}

/// 302 Found
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((LOCATION, location))
        .finish()
}
