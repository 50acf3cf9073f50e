//! Session entry filter
//!
//! The filter intercepts every inbound request before handler logic runs,
//! reads the session header and seeds the [`Carrier`] for the whole
//! downstream chain. Handler code never passes context by hand: the carrier
//! rides in the request extensions (reachable through the [`Correlation`]
//! extractor) and the inner service future runs inside
//! [`Bridged`](jalki_pipeline::Bridged), so even log statements in the
//! handler itself - outside any explicit chain - are tagged.
//!
//! Header policy:
//! - absent header → empty string (a valid, loggable "no correlation" state)
//! - repeated header → first value wins, the rest are ignored
//! - non-UTF-8 value → empty string
//!
//! The filter performs no I/O, never blocks and never fails a request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderName, Request};
use jalki_core::{Carrier, keys};
use jalki_pipeline::{BridgeExt, Bridged};
use std::convert::Infallible;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Layer inserting [`SessionFilter`] into a service stack
#[derive(Debug, Clone)]
pub struct SessionFilterLayer {
    header: HeaderName,
}

impl SessionFilterLayer {
    /// Filter on the default session header ([`keys::SESSION_ID`])
    pub fn new() -> Self {
        Self {
            header: HeaderName::from_static(keys::SESSION_ID),
        }
    }

    /// Filter on a custom header name
    ///
    /// The carrier key stays [`keys::SESSION_ID`] regardless of which
    /// header supplies the value, so log field names remain stable.
    pub fn with_header(header: HeaderName) -> Self {
        Self { header }
    }
}

impl Default for SessionFilterLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for SessionFilterLayer {
    type Service = SessionFilter<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionFilter {
            inner,
            header: self.header.clone(),
        }
    }
}

/// The middleware service wrapping every request with a carrier
#[derive(Debug, Clone)]
pub struct SessionFilter<S> {
    inner: S,
    header: HeaderName,
}

impl<S, B> Service<Request<B>> for SessionFilter<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Bridged<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let value = req
            .headers()
            .get_all(&self.header)
            .iter()
            .next()
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let carrier = Carrier::of(keys::SESSION_ID, value);
        req.extensions_mut().insert(carrier.clone());

        self.inner.call(req).bridged(&carrier)
    }
}

/// Extractor handing a request's carrier to axum handlers
///
/// Infallible: a request that skipped the filter yields an empty carrier.
///
/// ```ignore
/// async fn handler(Correlation(carrier): Correlation) -> String {
///     let outcome = Chain::seeded(carrier) /* ... */;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Correlation(pub Carrier);

impl<S> FromRequestParts<S> for Correlation
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts.extensions.get::<Carrier>().cloned().unwrap_or_default(),
        ))
    }
}
