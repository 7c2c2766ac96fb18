use foundation::bounds::Extent;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use scene::feature::Feature;

use crate::config::LayerConfig;
use crate::error::LoadError;
use crate::pipeline::{Completion, LoadingPipeline};
use crate::protocol::{DecodeOptions, decode_search_response, search_url};
use crate::request::FetchTask;

/// Fetches the features of one region.
///
/// Implementations hold no state between calls; the pipeline owns the
/// results.
pub trait FeatureFetcher {
    fn fetch(&self, extent: Extent) -> BoxFuture<'_, Result<Vec<Feature>, LoadError>>;
}

/// [`FeatureFetcher`] against the trajectory search endpoint.
#[derive(Debug, Clone)]
pub struct HttpFeatureFetcher {
    client: reqwest::Client,
    base_url: String,
    search_path: String,
    decode: DecodeOptions,
}

impl HttpFeatureFetcher {
    pub fn new(base_url: impl Into<String>, search_path: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            search_path: search_path.into(),
            decode: DecodeOptions::default(),
        }
    }

    pub fn from_config(cfg: &LayerConfig) -> Self {
        Self::new(cfg.base_url.clone(), cfg.search_path.clone()).with_decode_options(DecodeOptions {
            include_start: cfg.include_start_attribute,
        })
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_decode_options(mut self, decode: DecodeOptions) -> Self {
        self.decode = decode;
        self
    }

    pub fn url_for(&self, extent: &Extent) -> Result<String, LoadError> {
        search_url(&self.base_url, &self.search_path, extent)
    }
}

impl FeatureFetcher for HttpFeatureFetcher {
    fn fetch(&self, extent: Extent) -> BoxFuture<'_, Result<Vec<Feature>, LoadError>> {
        async move {
            let url = self.url_for(&extent)?;
            tracing::debug!(%url, "fetching trajectories");

            let resp = self.client.get(&url).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(LoadError::Network {
                    status: Some(status.as_u16()),
                    message: format!("{url} returned {status}"),
                });
            }

            let body = resp.bytes().await?;
            decode_search_response(&body, self.decode)
        }
        .boxed()
    }
}

/// Tally of one [`run_tasks`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub requested: usize,
    pub merged: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub discarded: usize,
    /// `(task, error)` per failed region, in completion order.
    pub failures: Vec<(FetchTask, LoadError)>,
}

impl LoadReport {
    /// The user-facing notice, if anything failed.
    pub fn notice(&self) -> Option<&'static str> {
        (!self.failures.is_empty()).then_some(crate::pipeline::LOAD_ERROR_NOTICE)
    }
}

/// Run fetches concurrently on the current task, handing each result to the
/// pipeline as it arrives. One failing region does not affect the others.
pub async fn run_tasks<F>(
    pipeline: &mut LoadingPipeline,
    fetcher: &F,
    tasks: Vec<FetchTask>,
) -> LoadReport
where
    F: FeatureFetcher + ?Sized,
{
    let mut report = LoadReport {
        requested: tasks.len(),
        ..LoadReport::default()
    };

    let mut in_flight: FuturesUnordered<_> = tasks
        .into_iter()
        .map(|task| fetcher.fetch(task.extent).map(move |result| (task, result)))
        .collect();

    while let Some((task, result)) = in_flight.next().await {
        match pipeline.on_fetch_complete(&task, result) {
            Completion::Merged(stats) => {
                report.merged += 1;
                report.inserted += stats.inserted;
                report.replaced += stats.replaced;
            }
            Completion::Failed { error, .. } => report.failures.push((task, error)),
            Completion::Discarded => report.discarded += 1,
        }
    }

    tracing::info!(
        requested = report.requested,
        merged = report.merged,
        failed = report.failures.len(),
        discarded = report.discarded,
        features = pipeline.store().len(),
        "load round finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use foundation::bounds::Extent;
    use foundation::math::{Projection, Vec2, from_lon_lat};
    use futures_util::FutureExt;
    use futures_util::future::BoxFuture;
    use pretty_assertions::assert_eq;
    use scene::feature::{Feature, FeatureId, Geometry, TrajectoryAttributes};
    use scene::picking::HitTester;

    use super::{FeatureFetcher, HttpFeatureFetcher, run_tasks};
    use crate::config::LayerConfig;
    use crate::error::LoadError;
    use crate::grid::TileGrid;
    use crate::pipeline::LoadingPipeline;
    use crate::protocol::parse_bbox;
    use crate::residency::ResidencyState;
    use crate::strategy::{ExtentLoadingStrategy, StrategyMode};

    const SEARCH_PATH: &str = "/api/trajectories/search/bbox";

    #[derive(Clone, Default)]
    struct Backend {
        seen: Arc<Mutex<Vec<String>>>,
        fail_with: Option<StatusCode>,
    }

    async fn search(
        State(backend): State<Backend>,
        Query(params): Query<BTreeMap<String, String>>,
    ) -> axum::response::Response {
        let bbox = params.get("bbox").cloned().unwrap_or_default();
        backend.seen.lock().expect("lock").push(bbox);

        if let Some(status) = backend.fail_with {
            return status.into_response();
        }

        let body = serde_json::json!({
            "_embedded": { "trajectories": [
                {
                    "geometry": { "type": "LineString", "coordinates": [[-118.5, 34.0], [-118.2, 34.1]] },
                    "start": "2008-10-23 02:53:04",
                    "durationInMinutes": 42,
                    "_links": { "self": { "href": "http://backend/api/trajectories/one" } }
                },
                {
                    "geometry": { "type": "LineString", "coordinates": [[-118.0, 33.9], [-117.8, 34.3]] },
                    "start": "2008-10-24 11:00:00",
                    "durationInMinutes": 15,
                    "_links": { "self": { "href": "http://backend/api/trajectories/two" } }
                }
            ] }
        });
        axum::Json(body).into_response()
    }

    async fn spawn_backend(backend: Backend) -> String {
        let app = Router::new().route(SEARCH_PATH, get(search)).with_state(backend);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{addr}")
    }

    fn local_fetcher(base_url: String) -> HttpFeatureFetcher {
        let client = reqwest::Client::builder().no_proxy().build().expect("client");
        HttpFeatureFetcher::new(base_url, SEARCH_PATH).with_client(client)
    }

    fn bbox_pipeline() -> LoadingPipeline {
        let cfg = LayerConfig {
            strategy: StrategyMode::Bbox,
            ..LayerConfig::default()
        };
        LoadingPipeline::from_config(&cfg).expect("pipeline")
    }

    fn la_viewport() -> Extent {
        let min = from_lon_lat([-119.0, 33.5].into()).expect("project");
        let max = from_lon_lat([-117.5, 34.6].into()).expect("project");
        Extent::from_corners(min, max, Projection::WebMercator)
    }

    #[tokio::test]
    async fn viewport_load_hits_backend_once_and_merges_features() {
        let backend = Backend::default();
        let base_url = spawn_backend(backend.clone()).await;
        let fetcher = local_fetcher(base_url);
        let mut pipeline = bbox_pipeline();

        let tasks = pipeline.on_viewport_change(la_viewport(), 150.0);
        let report = run_tasks(&mut pipeline, &fetcher, tasks).await;

        assert_eq!(report.requested, 1);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.notice(), None);

        let seen = backend.seen.lock().expect("lock").clone();
        assert_eq!(seen.len(), 1);
        let got = parse_bbox(&seen[0]).expect("bbox");
        let want = [-119.0, 33.5, -117.5, 34.6];
        let got = [got.min[0], got.min[1], got.max[0], got.max[1]];
        for (g, w) in got.iter().zip(want) {
            assert!((g - w).abs() < 1e-6, "bbox {got:?} != {want:?}");
        }

        let ids: Vec<&str> = pipeline.store().all().map(|f| f.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["http://backend/api/trajectories/one", "http://backend/api/trajectories/two"]
        );

        // Same viewport again: covered, no second request.
        assert!(pipeline.on_viewport_change(la_viewport(), 150.0).is_empty());
        assert_eq!(backend.seen.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn server_error_is_isolated_and_not_retried() {
        let backend = Backend {
            fail_with: Some(StatusCode::SERVICE_UNAVAILABLE),
            ..Backend::default()
        };
        let base_url = spawn_backend(backend.clone()).await;
        let fetcher = local_fetcher(base_url);
        let mut pipeline = bbox_pipeline();

        let tasks = pipeline.on_viewport_change(la_viewport(), 150.0);
        let request = tasks[0].request;
        let report = run_tasks(&mut pipeline, &fetcher, tasks).await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].1.status(), Some(503));
        assert_eq!(report.notice(), Some("Error loading data. Try Reset."));
        assert_eq!(
            pipeline.strategy().coverage().state_for_request(request),
            Some(ResidencyState::Failed)
        );
        assert!(pipeline.on_viewport_change(la_viewport(), 150.0).is_empty());
        assert_eq!(backend.seen.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error_without_status() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let fetcher = local_fetcher(format!("http://{addr}"));
        let err = fetcher.fetch(la_viewport()).await.unwrap_err();
        assert!(matches!(err, LoadError::Network { status: None, .. }), "{err:?}");
    }

    /// Answers every region with one feature named after the call number.
    struct CountingFetcher {
        calls: Mutex<usize>,
    }

    impl FeatureFetcher for CountingFetcher {
        fn fetch(&self, extent: Extent) -> BoxFuture<'_, Result<Vec<Feature>, LoadError>> {
            let n = {
                let mut calls = self.calls.lock().expect("lock");
                *calls += 1;
                *calls
            };
            async move {
                Ok(vec![Feature::new(
                    FeatureId::new(format!("f{n}")),
                    Geometry::Point(extent.center()),
                    TrajectoryAttributes::default(),
                )])
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn tiled_viewport_fetches_each_tile_once() {
        let fetcher = CountingFetcher {
            calls: Mutex::new(0),
        };
        let mut pipeline = LoadingPipeline::new(
            ExtentLoadingStrategy::with_grid(TileGrid::with_origin(Vec2::new(0.0, 0.0), 256)),
            HitTester::default(),
        );

        // 512x512 px view centered on the grid origin at 1 m/px: 2x2 tiles.
        let view = Extent::new([-256.0, -256.0], [256.0, 256.0]);
        let tasks = pipeline.on_viewport_change(view, 1.0);
        let report = run_tasks(&mut pipeline, &fetcher, tasks).await;
        assert_eq!(report.requested, 4);
        assert_eq!(pipeline.store().len(), 4);

        let again = pipeline.on_viewport_change(view, 1.0);
        assert!(again.is_empty());
        assert_eq!(*fetcher.calls.lock().expect("lock"), 4);
    }

    #[tokio::test]
    async fn unset_viewport_never_reaches_the_fetcher() {
        let fetcher = CountingFetcher {
            calls: Mutex::new(0),
        };
        let mut pipeline = LoadingPipeline::from_config(&LayerConfig::default()).expect("pipeline");

        let tasks = pipeline.on_viewport_change(Extent::UNSET, 150.0);
        let report = run_tasks(&mut pipeline, &fetcher, tasks).await;
        assert_eq!(report.requested, 0);
        assert_eq!(*fetcher.calls.lock().expect("lock"), 0);
        assert!(pipeline.store().is_empty());
    }

    #[test]
    fn fetcher_from_config_builds_search_urls() {
        let cfg = LayerConfig {
            base_url: "http://example.test/".to_string(),
            ..LayerConfig::default()
        };
        let fetcher = HttpFeatureFetcher::from_config(&cfg);
        let url = fetcher.url_for(&Extent::geographic(-1.0, -2.0, 3.0, 4.0)).expect("url");
        assert_eq!(url, "http://example.test/api/trajectories/search/bbox?bbox=-1,-2,3,4");
    }
}
