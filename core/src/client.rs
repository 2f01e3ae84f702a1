//! Typed endpoint methods over a host-supplied transport.
//!
//! # Design
//! `StarChartClient` owns its configuration, its transport and its response
//! cache. Every endpoint goes through [`StarChartClient::fetch`]: resolve the
//! endpoint URL, encode the query, derive the [`RequestIdentity`], answer from
//! the cache when possible, otherwise send, classify, and memoize successes.
//! Calls are sequential per caller; concurrent identical misses each reach
//! the network.

use http::Method;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::cache::{RequestIdentity, ResponseCache};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::{HttpRequest, Transport};
use crate::pagination::Paginator;
use crate::query::QueryParams;
use crate::response::{classify, classify_fault, decode, ApiResult};
use crate::types::{
    Data, NearbyStarSystem, Page, Pagination, Star, StarSystem, StarSystemFilters,
};

/// Page size used when aggregating full collections.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Client for the star chart catalog API.
#[derive(Debug)]
pub struct StarChartClient<T> {
    config: ClientConfig,
    api_root: String,
    headers: Vec<(String, String)>,
    transport: T,
    cache: ResponseCache,
}

impl<T: Transport> StarChartClient<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self::with_cache(config, transport, ResponseCache::new())
    }

    /// Build a client around an existing cache, e.g. one pre-seeded in tests.
    pub fn with_cache(config: ClientConfig, transport: T, cache: ResponseCache) -> Self {
        Self {
            api_root: config.api_root(),
            headers: config.request_headers(),
            config,
            transport,
            cache,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The request the client would send for `path` and `params`.
    pub fn build_request(&self, path: &str, params: &QueryParams) -> (HttpRequest, RequestIdentity) {
        let endpoint = format!("{}{path}", self.api_root);
        let identity = RequestIdentity::new(&endpoint, params);
        let request = HttpRequest {
            method: Method::GET,
            url: format!("{endpoint}{}", params.encode()),
            headers: self.headers.clone(),
        };
        (request, identity)
    }

    /// Perform a GET on `path` (relative to `{base_url}/{version}`), served
    /// from the cache when the same request already succeeded.
    pub fn fetch<R: DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<ApiResult<R>, ClientError> {
        let (request, identity) = self.build_request(path, params);

        if let Some(body) = self.cache.get(&identity) {
            debug!(%identity, "cache hit");
            return Ok(decode(200, &body));
        }
        debug!(%identity, url = %request.url, "cache miss, sending request");

        let response = match self.transport.send(&request) {
            Ok(response) => response,
            Err(e) => {
                debug!(%identity, error = %e, "transport fault");
                return classify_fault(e);
            }
        };

        let result = classify(&response);
        debug!(
            %identity,
            status = response.status,
            success = result.is_success(),
            "response classified"
        );
        if result.is_success() {
            self.cache.put(identity, response.body);
        }
        Ok(result)
    }

    pub fn list_star_systems(
        &self,
        filters: &StarSystemFilters,
        pagination: Pagination,
    ) -> Result<ApiResult<Page<StarSystem>>, ClientError> {
        let params = QueryParams::new().pagination(pagination).filters(filters);
        self.fetch("/star_systems", &params)
    }

    pub fn get_star_system(&self, id: u64) -> Result<ApiResult<StarSystem>, ClientError> {
        let result: ApiResult<Data<StarSystem>> =
            self.fetch(&format!("/star_systems/{id}"), &QueryParams::new())?;
        Ok(result.map(|envelope| envelope.data))
    }

    pub fn get_star(&self, id: u64) -> Result<ApiResult<Star>, ClientError> {
        let result: ApiResult<Data<Star>> =
            self.fetch(&format!("/stars/{id}"), &QueryParams::new())?;
        Ok(result.map(|envelope| envelope.data))
    }

    /// Systems within `max_distance` light years of `origin_id`. The server
    /// applies its own default radius when `max_distance` is `None`.
    pub fn list_nearby_star_systems(
        &self,
        origin_id: u64,
        filters: &StarSystemFilters,
        pagination: Pagination,
        max_distance: Option<f64>,
    ) -> Result<ApiResult<Page<NearbyStarSystem>>, ClientError> {
        let params = QueryParams::new()
            .with_opt("distance", max_distance)
            .pagination(pagination)
            .filters(filters);
        self.fetch(&format!("/star_systems/{origin_id}/nearby"), &params)
    }

    /// Aggregate every star system matching `filters`, page by page.
    pub fn all_star_systems(
        &self,
        filters: StarSystemFilters,
        page_size: Option<u32>,
    ) -> Paginator<'_, StarSystem> {
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        Paginator::new(move |page| {
            self.list_star_systems(&filters, Pagination::new(page, page_size))
        })
    }

    /// Aggregate every system near `origin_id`, page by page.
    pub fn all_nearby_star_systems(
        &self,
        origin_id: u64,
        filters: StarSystemFilters,
        max_distance: Option<f64>,
        page_size: Option<u32>,
    ) -> Paginator<'_, NearbyStarSystem> {
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        Paginator::new(move |page| {
            self.list_nearby_star_systems(
                origin_id,
                &filters,
                Pagination::new(page, page_size),
                max_distance,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    use super::*;
    use crate::error::TransportError;
    use crate::http::HttpResponse;
    use crate::pagination::AggregationState;
    use crate::types::SpectralClass;

    /// Records requests and replies from a queue of canned responses.
    struct Scripted {
        replies: RefCell<Vec<Result<HttpResponse, TransportError>>>,
        seen: RefCell<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<HttpResponse, TransportError>>) -> Self {
            Self {
                replies: RefCell::new(replies),
                seen: RefCell::new(Vec::new()),
            }
        }

        fn urls(&self) -> Vec<String> {
            self.seen.borrow().iter().map(|r| r.url.clone()).collect()
        }
    }

    impl Transport for Scripted {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.borrow_mut().push(request.clone());
            self.replies.borrow_mut().remove(0)
        }
    }

    fn client(replies: Vec<Result<HttpResponse, TransportError>>) -> StarChartClient<Scripted> {
        StarChartClient::new(ClientConfig::new("http://localhost:4000/api"), Scripted::new(replies))
    }

    fn systems_page(ids: &[u64], page: u32, page_size: u32, total: u64) -> HttpResponse {
        let data: Vec<_> = ids
            .iter()
            .map(|id| serde_json::json!({"id": id, "name": format!("System {id}")}))
            .collect();
        let total_pages = total.div_ceil(u64::from(page_size));
        let body = serde_json::json!({
            "data": data,
            "meta": {"page": page, "page_size": page_size, "total_entries": total, "total_pages": total_pages}
        });
        HttpResponse::json(200, body.to_string())
    }

    #[test]
    fn builds_versioned_url_with_query() {
        let c = client(Vec::new());
        let params = QueryParams::new().with("page", 2);
        let (request, identity) = c.build_request("/star_systems", &params);
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url, "http://localhost:4000/api/v1/star_systems?page=2");
        assert_eq!(identity.as_str(), "http://localhost:4000/api/v1/star_systems?page=2");
        assert!(request
            .headers
            .contains(&("Accept".to_string(), "application/json".to_string())));
    }

    #[test]
    fn list_star_systems_forwards_filters() {
        let c = client(vec![Ok(systems_page(&[1, 2], 1, 2, 5))]);
        let filters = StarSystemFilters {
            spectral_class: Some(SpectralClass::G),
            ..Default::default()
        };
        let page = c
            .list_star_systems(&filters, Pagination::new(1, 2))
            .unwrap()
            .success()
            .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.meta.total_pages, 3);

        let url = &c.transport().urls()[0];
        let (path, query) = url.split_once('?').unwrap();
        assert_eq!(path, "http://localhost:4000/api/v1/star_systems");
        let mut pairs: Vec<&str> = query.split('&').collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec!["page=1", "page_size=2", "spectral_class=G"]);
    }

    #[test]
    fn repeated_call_is_served_from_cache() {
        let c = client(vec![Ok(systems_page(&[1], 1, 1, 1))]);
        let first = c
            .list_star_systems(&StarSystemFilters::default(), Pagination::new(1, 1))
            .unwrap();
        let second = c
            .list_star_systems(&StarSystemFilters::default(), Pagination::new(1, 1))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(c.transport().urls().len(), 1);
        assert_eq!(c.cache().hits(), 1);
    }

    #[test]
    fn parameter_order_does_not_defeat_cache() {
        let c = client(vec![Ok(systems_page(&[1], 1, 1, 1))]);
        let a = QueryParams::new().with("page", 1).with("page_size", 1);
        let b = QueryParams::new().with("page_size", 1).with("page", 1);
        let first: ApiResult<Page<StarSystem>> = c.fetch("/star_systems", &a).unwrap();
        let second: ApiResult<Page<StarSystem>> = c.fetch("/star_systems", &b).unwrap();
        assert_eq!(first, second);
        assert_eq!(c.transport().urls().len(), 1);
    }

    /// Answers every request with the same system and counts attempts.
    #[derive(Default)]
    struct Counting {
        attempts: AtomicUsize,
    }

    impl Transport for Counting {
        fn send(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::json(200, r#"{"data":{"id":7,"name":"Vega"}}"#))
        }
    }

    #[test]
    fn shared_client_across_threads() {
        const THREADS: usize = 8;
        let c = StarChartClient::new(
            ClientConfig::new("http://localhost:4000/api"),
            Counting::default(),
        );
        let barrier = Barrier::new(THREADS);

        let results: Vec<ApiResult<StarSystem>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        c.get_star_system(7).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let first = &results[0];
        assert_eq!(first.as_success().map(|s| s.name.as_str()), Some("Vega"));
        assert!(results.iter().all(|r| r == first));
        let attempts = c.transport().attempts.load(Ordering::SeqCst);
        assert!((1..=THREADS).contains(&attempts), "{attempts}");
        assert_eq!(c.cache().len(), 1);
        assert_eq!(c.cache().hits() as usize + attempts, THREADS);
    }

    #[test]
    fn errors_are_not_cached() {
        let c = client(vec![
            Ok(HttpResponse::json(422, r#"{"errors":{"detail":"bad page_size"}}"#)),
            Ok(HttpResponse::new(500, "<html></html>").with_header("content-type", "text/html")),
            Err(TransportError::Connect("refused".to_string())),
            Ok(systems_page(&[1], 1, 1, 1)),
        ]);
        let call = || c.list_star_systems(&StarSystemFilters::default(), Pagination::new(1, 1));
        assert_eq!(call().unwrap(), ApiResult::ApiError("bad page_size".to_string()));
        assert!(matches!(
            call().unwrap(),
            ApiResult::UnexpectedError { status: 500, .. }
        ));
        assert!(matches!(
            call().unwrap(),
            ApiResult::UnexpectedError { status: 0, .. }
        ));
        assert!(call().unwrap().is_success());
        assert_eq!(c.transport().urls().len(), 4);
        assert_eq!(c.cache().len(), 1);
    }

    #[test]
    fn unreadable_failed_body_is_fatal() {
        let c = client(vec![Err(TransportError::Body {
            status: 503,
            message: "connection reset".to_string(),
        })]);
        let err = c.get_star(9).unwrap_err();
        assert!(matches!(err, ClientError::UnreadableErrorBody { status: 503, .. }));
        assert!(c.cache().is_empty());
    }

    #[test]
    fn get_star_system_unwraps_envelope() {
        let c = client(vec![Ok(HttpResponse::json(
            200,
            r#"{"data":{"id":3,"name":"Sirius","star_count":2}}"#,
        ))]);
        let system = c.get_star_system(3).unwrap().success().unwrap();
        assert_eq!(system.name, "Sirius");
        assert_eq!(system.star_count, Some(2));
        assert_eq!(c.transport().urls(), vec!["http://localhost:4000/api/v1/star_systems/3"]);
    }

    #[test]
    fn not_found_is_api_error() {
        let c = client(vec![Ok(HttpResponse::json(404, r#"{"errors":{"detail":"Not Found"}}"#))]);
        assert_eq!(
            c.get_star(404).unwrap(),
            ApiResult::ApiError("Not Found".to_string())
        );
    }

    #[test]
    fn nearby_includes_distance() {
        let body = r#"{"data":[{"system":{"id":2,"name":"B"},"distance":{"parsecs":1.0,"light_years":3.26}}],
                       "meta":{"page":1,"page_size":100,"total_entries":1,"total_pages":1}}"#;
        let c = client(vec![Ok(HttpResponse::json(200, body))]);
        let page = c
            .list_nearby_star_systems(1, &StarSystemFilters::default(), Pagination::default(), Some(10.5))
            .unwrap()
            .success()
            .unwrap();
        assert_eq!(page.data[0].system.id, 2);
        assert_eq!(
            c.transport().urls(),
            vec!["http://localhost:4000/api/v1/star_systems/1/nearby?distance=10.5"]
        );
    }

    #[test]
    fn aggregates_all_pages() {
        let c = client(vec![
            Ok(systems_page(&[1, 2], 1, 2, 5)),
            Ok(systems_page(&[3, 4], 2, 2, 5)),
            Ok(systems_page(&[5], 3, 2, 5)),
        ]);
        let mut paginator = c.all_star_systems(StarSystemFilters::default(), Some(2));
        assert_eq!(paginator.run_to_end(), &AggregationState::Complete);
        assert_eq!(paginator.collection().len(), 5);
        assert_eq!(paginator.total_expected(), 5);
        drop(paginator);
        assert_eq!(c.transport().urls().len(), 3);
    }

    #[test]
    fn second_aggregation_is_served_from_cache() {
        let c = client(vec![Ok(systems_page(&[1, 2], 1, 2, 2))]);
        c.all_star_systems(StarSystemFilters::default(), Some(2)).run_to_end();
        let mut again = c.all_star_systems(StarSystemFilters::default(), Some(2));
        assert_eq!(again.run_to_end(), &AggregationState::Complete);
        assert_eq!(again.collection().len(), 2);
        drop(again);
        assert_eq!(c.transport().urls().len(), 1);
    }
}
