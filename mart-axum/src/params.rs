use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use mart_catalog::{EntryId, ListingId};
use mart_core::{MartError, MartResult, RequestContext};

use crate::MartAxumError;

/// Header the upstream auth layer uses to pass the caller's identity.
pub const OWNER_HEADER: &str = "x-user-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the operation context from request headers.
///
/// A missing or blank owner header is `NotAuthenticated`. The request id set
/// by the request-id layer is reused so logs line up with the response header.
pub fn context_from_headers(headers: &HeaderMap) -> MartResult<RequestContext> {
    let owner = headers
        .get(OWNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| MartError::not_authenticated("Missing caller identity").into_anyhow())?;

    let ctx = RequestContext::new(owner);
    Ok(match headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
        Some(id) => ctx.with_request_id(id),
        None => ctx,
    })
}

/// Extractor for the authenticated caller.
#[derive(Debug, Clone)]
pub struct Caller(pub RequestContext);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = MartAxumError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Caller(context_from_headers(&parts.headers)?))
    }
}

fn parse_id<T: FromStr>(raw: &str, what: &str) -> MartResult<T> {
    raw.parse()
        .map_err(|_| MartError::not_found(format!("No {what} with id {raw}")).into_anyhow())
}

/// Path ids that do not parse are reported as not found.
pub fn entry_id(raw: &str) -> MartResult<EntryId> {
    parse_id(raw, "entry")
}

pub fn listing_id(raw: &str) -> MartResult<ListingId> {
    parse_id(raw, "listing")
}
