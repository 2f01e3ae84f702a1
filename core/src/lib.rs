//! Typed client core for the star chart catalog API.
//!
//! # Overview
//! Exposes the read-only catalog endpoints (star systems, stars, proximity
//! queries) as typed methods that return an exhaustive [`ApiResult`]. The
//! host supplies the HTTP round-trip through the [`Transport`] trait; the
//! core encodes queries, memoizes successful responses and classifies
//! outcomes. A [`Paginator`] assembles full collections page by page.
//!
//! # Design
//! - Expected failures are values: `ApiError` for server-explained failures,
//!   `UnexpectedError` for everything else. Only an unreadable body on a
//!   failed response is an `Err`.
//! - The response cache belongs to one client instance and is never shared
//!   implicitly, so several clients (e.g. in tests) never interfere.
//! - Pages are requested strictly one after another.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod pagination;
pub mod query;
pub mod response;
pub mod types;

pub use cache::{RequestIdentity, ResponseCache};
pub use client::{StarChartClient, DEFAULT_PAGE_SIZE};
pub use config::ClientConfig;
pub use error::{ClientError, TransportError};
pub use crate::http::{HttpRequest, HttpResponse, Transport};
pub use pagination::{
    AbortHandle, AggregatedCollection, AggregationState, PageFailure, PageResult, Paginator,
};
pub use query::{encode, QueryParams, QueryValue};
pub use response::{classify, classify_fault, ApiResult, TRANSPORT_FAILURE_STATUS};
pub use types::{
    Data, Distance, ErrorDetail, ErrorEnvelope, Identified, NearbyStarSystem, Page, Pagination,
    PaginationMeta, SpectralClass, Star, StarSystem, StarSystemFilters,
};
