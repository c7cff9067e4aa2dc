pub mod envelope;
pub mod extract;
pub mod handlers;
pub mod state;

pub use extract::{AuthenticatedUser, JsonBody, AUTH_TOKEN_HEADER};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use handlers::*;

/// Create the Axum router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        // Authentication
        .route("/mgmt/shared/authn/login", post(login))
        .route("/mgmt/shared/authz/tokens/{token}", get(token_info))
        // System
        .route("/mgmt/tm/sys", get(sys_info))
        .route("/mgmt/tm/sys/global-settings", get(global_settings))
        // Pools
        .route(
            "/mgmt/tm/ltm/pool",
            get(list_pools).post(create_pool).options(list_pools),
        )
        .route(
            "/mgmt/tm/ltm/pool/{id}",
            get(get_pool)
                .put(update_pool)
                .patch(update_pool)
                .delete(delete_pool),
        )
        // Pool members
        .route(
            "/mgmt/tm/ltm/pool/{id}/members",
            get(list_members).post(create_member),
        )
        .route(
            "/mgmt/tm/ltm/pool/{id}/members/{member}",
            get(get_member)
                .put(update_member)
                .patch(update_member)
                .delete(delete_member),
        )
        // Virtual servers
        .route(
            "/mgmt/tm/ltm/virtual",
            get(list_virtuals).post(create_virtual),
        )
        .route(
            "/mgmt/tm/ltm/virtual/{id}",
            get(get_virtual)
                .put(update_virtual)
                .patch(update_virtual)
                .delete(delete_virtual),
        )
        .fallback(unmatched)
        .method_not_allowed_fallback(unmatched)
        // Bodies are buffered whole; clients may push large configs
        .layer(DefaultBodyLimit::disable())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
