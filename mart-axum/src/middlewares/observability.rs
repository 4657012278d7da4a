//! Request tracing and request-id layers.
//!
//! Every request gets an `x-request-id` (a fresh UUID unless the client sent
//! one), the id is visible to handlers and echoed on the response, and the
//! request/response pair is traced.

use axum::http::HeaderName;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::params::REQUEST_ID_HEADER;

fn request_id_header() -> HeaderName {
    HeaderName::from_static(REQUEST_ID_HEADER)
}

pub fn create_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(request_id_header(), MakeRequestUuid)
}

pub fn create_propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(request_id_header())
}

/// Wrap a router in the request-id and trace layers, outermost first.
pub fn instrument(router: Router<()>) -> Router<()> {
    router.layer(
        ServiceBuilder::new()
            .layer(create_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(create_propagate_request_id_layer()),
    )
}
