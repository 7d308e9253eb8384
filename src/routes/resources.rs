use crate::{AppState, controllers, rest::RestfulApi};
use axum::Router;

/// Resource Router Module
///
/// Installs every controller under `{base}/{version}/{name}` with `{id}` as the
/// item segment.
pub fn resource_routes(state: &AppState) -> Router<AppState> {
    let api = RestfulApi::new(&state.config.api_base).with_post_parameter("{id}");
    controllers::all()
        .iter()
        .fold(Router::new(), |router, rc| api.install(router, state, rc.as_ref()))
}
