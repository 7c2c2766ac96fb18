use foundation::Viewport;
use foundation::math::Vec2;

use crate::feature::Feature;
use crate::store::FeatureStore;
use crate::style::LineStyle;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickOptions {
    /// Maximum distance in pixels between the click and a rendered geometry.
    pub tolerance_px: f64,
    /// Cap on returned hits; `None` returns every hit.
    pub limit: Option<usize>,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            tolerance_px: 2.0,
            limit: None,
        }
    }
}

/// Answers "what was clicked" against a [`FeatureStore`].
///
/// Ordering contract:
/// - Hits are returned topmost-rendered first.
/// - Every feature under the pixel is returned unless a `limit` is set.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HitTester {
    opts: PickOptions,
}

impl HitTester {
    pub fn new(opts: PickOptions) -> Self {
        Self { opts }
    }

    /// Tolerance covers half the stroke plus `extra_px` of slack.
    pub fn for_style(style: &LineStyle, extra_px: f64) -> Self {
        Self::new(PickOptions {
            tolerance_px: style.width as f64 / 2.0 + extra_px.max(0.0),
            ..PickOptions::default()
        })
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.opts.limit = limit;
        self
    }

    pub fn options(&self) -> PickOptions {
        self.opts
    }

    pub fn test_at_pixel<'s>(
        &self,
        store: &'s FeatureStore,
        viewport: &Viewport,
        pixel: Vec2,
    ) -> Vec<&'s Feature> {
        let mut hits = store.query_at_pixel(viewport, pixel, self.opts.tolerance_px);
        if let Some(limit) = self.opts.limit {
            hits.truncate(limit);
        }
        hits
    }
}

impl Default for HitTester {
    fn default() -> Self {
        Self::for_style(&LineStyle::default(), 1.0)
    }
}

/// One line of the click detail panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoRow {
    pub duration: String,
    pub link: String,
}

impl std::fmt::Display for InfoRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\t{}", self.duration, self.link)
    }
}

/// Detail rows for a hit list, in hit order.
pub fn describe(hits: &[&Feature]) -> Vec<InfoRow> {
    hits.iter()
        .map(|f| InfoRow {
            duration: format!("{} min.", f.attributes.duration_minutes),
            link: f.id.to_string(),
        })
        .collect()
}
