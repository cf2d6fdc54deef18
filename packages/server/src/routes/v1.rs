use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(user_routes())
        .merge(auth_routes())
        .merge(pic_routes(config.server.max_upload_bytes))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::user::create_user))
        .routes(routes!(handlers::user::update_user))
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(
        handlers::auth::get_refresh_token,
        handlers::auth::delete_token
    ))
}

fn pic_routes(max_upload_bytes: usize) -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(
            handlers::pic::find_index_pics,
            handlers::pic::upsert_pic
        ))
        .layer(handlers::pic::upload_body_limit(max_upload_bytes));

    OpenApiRouter::new()
        .routes(routes!(
            handlers::pic::lookup_pic_details,
            handlers::pic::purge_pic
        ))
        .routes(routes!(
            handlers::pic::lookup_pic_vote,
            handlers::pic::upsert_pic_vote
        ))
        .routes(routes!(handlers::pic::add_pic_comment))
        .routes(routes!(handlers::pic::add_pic_tags))
        .routes(routes!(handlers::pic::increment_view_count))
        .routes(routes!(handlers::pic::soft_delete_pic))
        .routes(routes!(handlers::pic::hard_delete_pic))
        .routes(routes!(handlers::pic::find_similar_pics))
        .routes(routes!(handlers::pic::read_pic))
        .merge(upload)
}
