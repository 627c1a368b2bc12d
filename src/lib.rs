//! YaMDb: a review-aggregation REST API.
//!
//! Users sign up with an email address, receive a confirmation code by
//! mail and trade it for a bearer token. With a token they review titles
//! (films, books, songs) and comment on reviews; staff moderate, admins
//! curate the catalog of categories, genres and titles.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: HMAC-signed bearer tokens
//! - **Format**: JSON requests/responses

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod permissions;
pub mod services;
pub mod state;
pub mod validation;

pub use state::AppState;

/// Build the HTTP router.
///
/// Every `/api/v1` route runs behind the token middleware, which lets
/// anonymous requests through and rejects bad tokens. Per-route access
/// rules live in the handlers.
pub fn build_router(state: AppState) -> Router {
    use handlers::{auth, catalog, comments, health, reviews, titles, users};

    let api = Router::new()
        // Registration
        .route("/api/v1/auth/signup", post(auth::sign_up))
        .route("/api/v1/auth/token", post(auth::obtain_token))
        // Users
        .route(
            "/api/v1/users",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/api/v1/users/me",
            get(users::get_me).patch(users::update_me),
        )
        .route(
            "/api/v1/users/{username}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        // Catalog
        .route(
            "/api/v1/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/api/v1/categories/{slug}",
            delete(catalog::delete_category),
        )
        .route(
            "/api/v1/genres",
            get(catalog::list_genres).post(catalog::create_genre),
        )
        .route("/api/v1/genres/{slug}", delete(catalog::delete_genre))
        // Titles
        .route(
            "/api/v1/titles",
            get(titles::list_titles).post(titles::create_title),
        )
        .route(
            "/api/v1/titles/{title_id}",
            get(titles::get_title)
                .patch(titles::update_title)
                .delete(titles::delete_title),
        )
        // Reviews
        .route(
            "/api/v1/titles/{title_id}/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route(
            "/api/v1/titles/{title_id}/reviews/{review_id}",
            get(reviews::get_review)
                .patch(reviews::update_review)
                .delete(reviews::delete_review),
        )
        // Comments
        .route(
            "/api/v1/titles/{title_id}/reviews/{review_id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            get(comments::get_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
