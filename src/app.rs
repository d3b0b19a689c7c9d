use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/user",
            get(handlers::current_user)
                .post(handlers::register_user)
                .delete(handlers::delete_user),
        )
        .route("/api/user/switch", post(handlers::switch_user))
        .route(
            "/api/coffees",
            get(handlers::list_coffees).post(handlers::add_coffee),
        )
        .route("/api/coffees/:id", delete(handlers::remove_coffee))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/habits", get(handlers::get_habits))
        .route(
            "/api/theme",
            get(handlers::get_theme).put(handlers::set_theme),
        )
        .with_state(state)
}
