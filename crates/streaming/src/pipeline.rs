use foundation::Viewport;
use foundation::bounds::Extent;
use foundation::math::Vec2;
use scene::feature::Feature;
use scene::picking::HitTester;
use scene::store::{FeatureStore, MergeStats};

use crate::config::LayerConfig;
use crate::error::{ConfigError, LoadError};
use crate::request::FetchTask;
use crate::residency::ResidencyState;
use crate::strategy::{ExtentLoadingStrategy, Region};
use crate::toggle::{LoadingToggle, Transition};

/// Shown to the user when a region fails to load.
pub const LOAD_ERROR_NOTICE: &str = "Error loading data. Try Reset.";

/// What happened to a finished fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Merged(MergeStats),
    /// The region stays covered; the notice is for the user.
    Failed {
        error: LoadError,
        notice: &'static str,
    },
    /// Issued under an older generation (loading was switched off or reset
    /// since); nothing was touched.
    Discarded,
}

/// Owns all loader state and reacts to viewport, fetch, toggle and click
/// events.
///
/// Event handlers return the fetch tasks to run; running them is up to the
/// caller (see [`crate::io::run_tasks`]). Every task is stamped with the
/// toggle generation it was issued under.
#[derive(Debug)]
pub struct LoadingPipeline {
    strategy: ExtentLoadingStrategy,
    store: FeatureStore,
    toggle: LoadingToggle,
    hit_tester: HitTester,
    last_view: Option<(Extent, f64)>,
    toggle_guard: bool,
}

impl LoadingPipeline {
    pub fn new(strategy: ExtentLoadingStrategy, hit_tester: HitTester) -> Self {
        Self {
            strategy,
            store: FeatureStore::new(),
            toggle: LoadingToggle::new(),
            hit_tester,
            last_view: None,
            toggle_guard: true,
        }
    }

    pub fn from_config(cfg: &LayerConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let strategy =
            ExtentLoadingStrategy::new(cfg.strategy).with_max_regions(cfg.max_regions_per_view);
        let hit_tester = HitTester::for_style(&cfg.line_style()?, cfg.hit_tolerance_px)
            .with_limit(cfg.hit_limit);
        Ok(Self::new(strategy, hit_tester).with_toggle_guard(cfg.toggle_guard_enabled))
    }

    /// When off, viewport changes keep loading while the toggle is disabled.
    pub fn with_toggle_guard(mut self, enabled: bool) -> Self {
        self.toggle_guard = enabled;
        self
    }

    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    pub fn strategy(&self) -> &ExtentLoadingStrategy {
        &self.strategy
    }

    pub fn hit_tester(&self) -> &HitTester {
        &self.hit_tester
    }

    pub fn toggle(&self) -> &LoadingToggle {
        &self.toggle
    }

    pub fn is_loading_enabled(&self) -> bool {
        self.toggle.is_enabled()
    }

    pub fn last_view(&self) -> Option<(Extent, f64)> {
        self.last_view
    }

    pub fn on_viewport_change(&mut self, extent: Extent, resolution: f64) -> Vec<FetchTask> {
        if extent.is_unset() {
            return Vec::new();
        }
        self.last_view = Some((extent, resolution));

        if self.toggle_guard && !self.toggle.is_enabled() {
            tracing::debug!("loading disabled; ignoring viewport change");
            return Vec::new();
        }
        self.issue(extent, resolution)
    }

    fn issue(&mut self, extent: Extent, resolution: f64) -> Vec<FetchTask> {
        let generation = self.toggle.generation();
        self.strategy
            .compute_missing_regions(&extent, resolution)
            .into_iter()
            .map(|Region { request, extent, resolution, .. }| FetchTask {
                request,
                generation,
                extent,
                resolution,
            })
            .collect()
    }

    pub fn on_fetch_complete(
        &mut self,
        task: &FetchTask,
        result: Result<Vec<Feature>, LoadError>,
    ) -> Completion {
        if !self.toggle.is_current(task.generation) {
            tracing::debug!(request = %task.request, generation = %task.generation, "discarding stale completion");
            return Completion::Discarded;
        }

        match result {
            Ok(features) => {
                let stats = self.store.merge(features);
                self.mark(task, ResidencyState::Resident);
                tracing::debug!(
                    request = %task.request,
                    inserted = stats.inserted,
                    replaced = stats.replaced,
                    total = self.store.len(),
                    "merged features"
                );
                Completion::Merged(stats)
            }
            Err(error) => {
                self.mark(task, ResidencyState::Failed);
                tracing::warn!(request = %task.request, %error, "region failed to load");
                Completion::Failed {
                    error,
                    notice: LOAD_ERROR_NOTICE,
                }
            }
        }
    }

    fn mark(&mut self, task: &FetchTask, state: ResidencyState) {
        if let Err(err) = self.strategy.mark(task.request, state) {
            tracing::debug!(%err, "coverage not updated");
        }
    }

    /// Switch loading on or off.
    ///
    /// Off clears the store and evicts coverage; on re-evaluates the last
    /// viewport so evicted regions load again.
    pub fn set_loading_enabled(&mut self, enabled: bool) -> Vec<FetchTask> {
        match self.toggle.set(enabled) {
            None => Vec::new(),
            Some(Transition::Disabled) => {
                self.store.clear();
                let evicted = self.strategy.evict_all();
                tracing::info!(evicted, generation = %self.toggle.generation(), "loading disabled");
                Vec::new()
            }
            Some(Transition::Enabled) => {
                tracing::info!("loading enabled");
                match self.last_view {
                    Some((extent, resolution)) => self.issue(extent, resolution),
                    None => Vec::new(),
                }
            }
        }
    }

    /// Forget coverage and features, then reload the last viewport if loading
    /// is enabled.
    pub fn reset(&mut self) -> Vec<FetchTask> {
        self.strategy.reset();
        self.store.clear();
        let generation = self.toggle.bump();
        tracing::info!(%generation, "loader reset");

        match self.last_view {
            Some((extent, resolution)) if self.toggle.is_enabled() => self.issue(extent, resolution),
            _ => Vec::new(),
        }
    }

    /// Features under `pixel`, topmost first.
    pub fn hit_test(&self, viewport: &Viewport, pixel: Vec2) -> Vec<&Feature> {
        self.hit_tester.test_at_pixel(&self.store, viewport, pixel)
    }
}
