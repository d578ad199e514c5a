//! Order HTTP routes. Thin shells over the coordinator: no domain logic
//! lives here, only payload shapes and status codes.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::domain::{OrderId, OrderStatus};
use crate::error::AppError;
use crate::extractors::current_actor::CurrentActor;
use crate::services::orders::{DetailsPatch, NewOrder};
use crate::state::app_state::AppState;

#[derive(Debug, Deserialize)]
struct StatusChangeRequest {
    status: OrderStatus,
}

#[derive(Debug, Deserialize)]
struct MessageRequest {
    content: String,
}

/// POST /api/orders
async fn create_order(
    current_actor: CurrentActor,
    app_state: web::Data<AppState>,
    body: web::Json<NewOrder>,
) -> Result<HttpResponse, AppError> {
    let order = app_state
        .coordinator()
        .create_order(&current_actor.0, body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(order))
}

/// GET /api/orders/{order_id}
async fn get_order(
    current_actor: CurrentActor,
    app_state: web::Data<AppState>,
    path: web::Path<OrderId>,
) -> Result<HttpResponse, AppError> {
    let order = app_state
        .coordinator()
        .get_order(path.into_inner(), &current_actor.0)
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

/// POST /api/orders/{order_id}/accept
async fn accept_order(
    current_actor: CurrentActor,
    app_state: web::Data<AppState>,
    path: web::Path<OrderId>,
) -> Result<HttpResponse, AppError> {
    let order = app_state
        .coordinator()
        .accept_order(path.into_inner(), &current_actor.0)
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

/// POST /api/orders/{order_id}/reject
async fn reject_order(
    current_actor: CurrentActor,
    app_state: web::Data<AppState>,
    path: web::Path<OrderId>,
) -> Result<HttpResponse, AppError> {
    let order = app_state
        .coordinator()
        .reject_order(path.into_inner(), &current_actor.0)
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

/// POST /api/orders/{order_id}/status
async fn update_status(
    current_actor: CurrentActor,
    app_state: web::Data<AppState>,
    path: web::Path<OrderId>,
    body: web::Json<StatusChangeRequest>,
) -> Result<HttpResponse, AppError> {
    let order = app_state
        .coordinator()
        .update_status(path.into_inner(), &current_actor.0, body.status)
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

/// POST /api/orders/{order_id}/details
async fn update_details(
    current_actor: CurrentActor,
    app_state: web::Data<AppState>,
    path: web::Path<OrderId>,
    body: web::Json<DetailsPatch>,
) -> Result<HttpResponse, AppError> {
    let order = app_state
        .coordinator()
        .update_details(path.into_inner(), &current_actor.0, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

/// POST /api/orders/{order_id}/reactivate
async fn reactivate(
    current_actor: CurrentActor,
    app_state: web::Data<AppState>,
    path: web::Path<OrderId>,
) -> Result<HttpResponse, AppError> {
    let order = app_state
        .coordinator()
        .reactivate(path.into_inner(), &current_actor.0)
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

/// POST /api/orders/{order_id}/messages
async fn send_message(
    current_actor: CurrentActor,
    app_state: web::Data<AppState>,
    path: web::Path<OrderId>,
    body: web::Json<MessageRequest>,
) -> Result<HttpResponse, AppError> {
    let message = app_state
        .coordinator()
        .send_message(path.into_inner(), &current_actor.0, body.into_inner().content)
        .await?;
    Ok(HttpResponse::Created().json(message))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(create_order))
        .route("/{order_id}", web::get().to(get_order))
        .route("/{order_id}/accept", web::post().to(accept_order))
        .route("/{order_id}/reject", web::post().to(reject_order))
        .route("/{order_id}/status", web::post().to(update_status))
        .route("/{order_id}/details", web::post().to(update_details))
        .route("/{order_id}/reactivate", web::post().to(reactivate))
        .route("/{order_id}/messages", web::post().to(send_message));
}
