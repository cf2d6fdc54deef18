mod v1;

use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/v1", v1::routes(config))
}

/// Public pic file URLs, outside the API prefix.
pub fn pix_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::pix::serve_pix))
}
