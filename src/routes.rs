// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, patch, post},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::RateLimit,
    handlers::{auth, comments, posts, users},
    state::AppState,
    utils::jwt::auth_middleware,
};

fn cors_layer(website_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match HeaderValue::from_str(website_url) {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!("Ignoring invalid WEBSITE_URL {:?} for CORS: {}", website_url, e);
            cors
        }
    }
}

/// Assembles the main application router.
///
/// * `/api/users`: sign-up, login, profiles.
/// * `/api/posts`: posts and their comment threads.
///
/// Mutating routes sit behind `auth_middleware`; listings are public.
/// Login, post creation and post updates are rate limited per client IP.
pub fn create_router(state: AppState) -> Router {
    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);
    let limits = state.config.rate_limits.clone();

    // Keyed by peer IP, which needs `ConnectInfo<SocketAddr>`: serve with
    // `into_make_service_with_connect_info`.
    let governor = |limit: RateLimit| {
        let config = GovernorConfigBuilder::default()
            .period(limit.replenish_interval())
            .burst_size(limit.burst_size())
            .finish()
            .expect("RateLimit never yields a zero period or burst");
        GovernorLayer::new(Arc::new(config))
    };

    let user_routes = Router::new()
        .route("/signup", post(auth::sign_up))
        .route(
            "/login",
            post(auth::login).route_layer(governor(limits.login)),
        )
        .route("/profile/{username}", get(users::get_by_username))
        .merge(
            Router::new()
                .route("/me", get(users::get_me).patch(users::update_me))
                .route_layer(require_auth.clone()),
        );

    let post_routes = Router::new()
        .route("/", get(posts::list_posts))
        .route("/slugs", get(posts::list_slugs))
        .route("/post/{slug}", get(posts::get_post_by_slug))
        .route("/{post_id}/comments", get(comments::list_comments))
        .route("/comments/{comment_id}/replies", get(comments::list_replies))
        // Protected routes; merged method-by-method into the public ones above.
        .merge(
            Router::new()
                .route(
                    "/",
                    post(posts::create_post).route_layer(governor(limits.create_post)),
                )
                .route(
                    "/{post_id}",
                    patch(posts::update_post)
                        .route_layer(governor(limits.update_post))
                        .delete(posts::delete_post),
                )
                .route("/{post_id}/comments", post(comments::create_comment))
                .route(
                    "/comments/{comment_id}",
                    patch(comments::update_comment).delete(comments::delete_comment),
                )
                .route_layer(require_auth),
        );

    let cors = cors_layer(&state.config.website_url);

    Router::new()
        .nest("/api/users", user_routes)
        .nest("/api/posts", post_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
