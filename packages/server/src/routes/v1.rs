use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/positions", position_routes())
        .nest("/divisions", division_routes())
        .nest("/users", user_routes())
        .nest("/groups", group_routes())
        .nest("/permissions", permission_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
        .routes(routes!(handlers::auth::change_password))
}

fn position_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::position::list_positions,
            handlers::position::create_position
        ))
        .routes(routes!(handlers::position::position_tree))
        .routes(routes!(
            handlers::position::get_position,
            handlers::position::update_position,
            handlers::position::delete_position
        ))
        .routes(routes!(handlers::position::link_group))
        .routes(routes!(handlers::position::sync_members))
        .routes(routes!(handlers::position::deactivate_position))
        .routes(routes!(handlers::position::activate_position))
}

fn division_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::division::list_divisions,
            handlers::division::create_division
        ))
        .routes(routes!(
            handlers::division::get_division,
            handlers::division::update_division,
            handlers::division::delete_division
        ))
        .routes(routes!(handlers::division::division_statistics))
        .routes(routes!(handlers::division::division_employees))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::user::list_users))
        .routes(routes!(
            handlers::user::get_user,
            handlers::user::update_user,
            handlers::user::delete_user
        ))
        .routes(routes!(handlers::user::restore_user))
}

fn group_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::group::list_groups,
            handlers::group::create_group
        ))
        .routes(routes!(handlers::group::get_group))
        .routes(routes!(handlers::group::set_group_permissions))
}

fn permission_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::group::list_permissions))
}
