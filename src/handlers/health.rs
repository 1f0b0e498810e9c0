// src/handlers/health.rs
// DOCUMENTATION: Health check handler
// PURPOSE: Simple endpoint to verify service status

use actix_web::{web, HttpResponse, Responder};

pub const HEALTH_MESSAGE: &str = "✅ FRAME Web App backend is running!";

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(HEALTH_MESSAGE)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(health_check));
}
