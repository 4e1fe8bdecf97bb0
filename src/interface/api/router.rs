//! API Router configuration

use axum::{
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::call_handler::{channel_token, initiate_call};
use super::dm_handler::{list_messages, list_threads, mark_read, open_thread, send_message};
use super::friend_handler::{
    accept_request, cancel_request, friend_status, list_friends, list_requests, reject_request,
    remove_friend, send_request,
};
use super::metrics_handler::metrics_handler;
use super::state::AppState;
use super::user_handler::{check_handle, get_user, health_check, login, signup};
use super::websocket::websocket_handler;

/// Build the API router
pub fn build_router(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    // Health check route (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    // Account routes (no auth required)
    let auth_routes = Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/check-handle/:handle", get(check_handle));

    let user_routes = Router::new().route("/users/:id", get(get_user));

    // Friend graph routes
    let friend_routes = Router::new()
        .route("/friends", get(list_friends))
        .route("/friends/status/:other", get(friend_status))
        .route("/friends/:other", delete(remove_friend))
        .route("/friends/requests", get(list_requests).post(send_request))
        .route("/friends/requests/:user/accept", post(accept_request))
        .route("/friends/requests/:user/reject", post(reject_request))
        .route("/friends/requests/:user", delete(cancel_request));

    // Call routes
    let call_routes = Router::new()
        .route("/calls", post(initiate_call))
        .route("/calls/token", post(channel_token));

    // Direct message routes
    let dm_routes = Router::new()
        .route("/dm/threads", get(list_threads).post(open_thread))
        .route(
            "/dm/threads/:id/messages",
            get(list_messages).post(send_message),
        )
        .route("/dm/threads/:id/read", post(mark_read));

    let ws_routes = Router::new().route("/ws", get(websocket_handler));

    // Metrics route (separate state)
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    // Combine routes with state
    Router::new()
        .merge(health_routes)
        .merge(auth_routes)
        .merge(user_routes)
        .merge(friend_routes)
        .merge(call_routes)
        .merge(dm_routes)
        .merge(ws_routes)
        .with_state(state)
        .merge(metrics_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
