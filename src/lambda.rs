//! Lambda event adaptation
//!
//! API Gateway REST events on a named stage reach the function with the stage
//! prepended to the path (`/prod/authorize`). Routes are matched on the raw
//! resource path instead, so the router sees `/authorize` whatever the stage.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Request, Uri};
use lambda_http::{Body, RequestExt};
use tracing::warn;

/// Converts a Lambda request into the router's request type
pub fn into_router_request(event: lambda_http::Request) -> Request<Full<Bytes>> {
    let raw_path = event.raw_http_path().to_string();
    let (mut parts, body) = event.into_parts();

    if !raw_path.is_empty() {
        let path_and_query = match parts.uri.query() {
            Some(query) => format!("{}?{}", raw_path, query),
            None => raw_path,
        };
        match path_and_query.parse::<Uri>() {
            Ok(uri) => parts.uri = uri,
            Err(e) => warn!(path = %path_and_query, error = %e, "Keeping staged request path"),
        }
    }

    let bytes = match body {
        Body::Empty => Bytes::new(),
        Body::Text(text) => Bytes::from(text),
        Body::Binary(data) => Bytes::from(data),
    };
    Request::from_parts(parts, Full::new(bytes))
}
