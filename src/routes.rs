// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, cases, leaderboard},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, player_middleware},
};

/// Assembles the main application router.
///
/// * Public: player and admin login.
/// * Player session: case board, case flow, own profile.
/// * Any session: leaderboard (plain and streamed).
/// * Admin session: review panel and case authoring.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let authenticated = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(middleware::from_fn(player_middleware))
                .merge(Router::new().route("/session", get(auth::session)))
                .layer(authenticated.clone()),
        );

    // Auth first, then player role check
    let case_routes = Router::new()
        .route("/", get(cases::list_cases))
        .route("/{id}", get(cases::open_case))
        .route("/{id}/attempt", get(cases::attempt_status))
        .route("/{id}/submit", post(cases::submit_case))
        .layer(middleware::from_fn(player_middleware))
        .layer(authenticated.clone());

    let leaderboard_routes = Router::new()
        .route("/", get(leaderboard::get_leaderboard))
        .route("/stream", get(leaderboard::stream_leaderboard))
        .layer(authenticated.clone());

    let admin_routes = Router::new().route("/login", post(admin::login)).merge(
        Router::new()
            .route("/submissions", get(admin::list_submissions))
            .route("/submissions/{id}", get(admin::get_submission))
            .route("/submissions/{id}/approve", post(admin::approve_submission))
            .route("/submissions/{id}/reject", post(admin::reject_submission))
            .route("/cases", post(admin::create_case))
            // Double middleware protection: Auth first, then Admin check
            .layer(middleware::from_fn(admin_middleware))
            .layer(authenticated),
    );

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/cases", case_routes)
        .nest("/api/leaderboard", leaderboard_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
