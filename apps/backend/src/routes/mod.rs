use actix_web::web;

pub mod health;
pub mod orders;
pub mod realtime;

/// Configure application routes for tests and non-HttpServer contexts.
///
/// `main.rs` wires the same tree under the production middleware stack;
/// tests register the paths directly so endpoint behavior can be
/// exercised without the outer wrappers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Health check routes: /health
    cfg.service(web::scope("/health").configure(health::configure_routes));

    // Order routes: /api/orders/**
    cfg.service(web::scope("/api/orders").configure(orders::configure_routes));

    // Realtime routes: /api/ws
    cfg.service(web::scope("/api/ws").configure(realtime::configure_routes));
}
