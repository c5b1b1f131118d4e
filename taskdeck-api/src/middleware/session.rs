/// Session gate middleware
///
/// Applied once around the whole router. Every request is classified by
/// path:
///
/// - public paths pass through untouched
/// - protected paths need a valid session token (cookie `authToken`, else
///   `Authorization: Bearer`); the decoded identity is attached to the
///   request as an [`AuthContext`]
///
/// A rejected API request gets `401` JSON; a rejected page request is
/// redirected to `/login`. Either way the handler, and therefore the store,
/// never runs.

use crate::app::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use taskdeck_shared::auth::gate::{classify, AuthContext, RouteAccess, RouteKind};

/// Where rejected page requests are sent
pub const LOGIN_PAGE: &str = "/login";

/// Session gate middleware function
pub async fn session_gate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let kind = match classify(req.uri().path()) {
        RouteAccess::Public => return next.run(req).await,
        RouteAccess::Protected(kind) => kind,
    };

    match state.gate.require(req.headers()) {
        Ok(claims) => {
            req.extensions_mut().insert(AuthContext::from(claims));
            next.run(req).await
        }
        Err(rejection) => match kind {
            RouteKind::Api => rejection.into_response(),
            RouteKind::Page => Redirect::to(LOGIN_PAGE).into_response(),
        },
    }
}
