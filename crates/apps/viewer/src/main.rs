use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use foundation::Viewport;
use foundation::math::Vec2;
use scene::picking::describe;
use streaming::{
    FeatureFetcher, HttpFeatureFetcher, LayerConfig, LoadingPipeline, StrategyMode, parse_bbox,
    run_tasks,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Viewport-driven trajectory loader")]
struct Args {
    /// JSON layer config; missing keys keep their defaults
    #[arg(long, env = "TRAJECTORIES_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL (overrides the config file)
    #[arg(long, env = "TRAJECTORIES_BASE_URL")]
    base_url: Option<String>,

    /// Search endpoint path (overrides the config file)
    #[arg(long, env = "TRAJECTORIES_SEARCH_PATH")]
    search_path: Option<String>,

    /// Coverage strategy (overrides the config file)
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Mode {
    Tiled,
    Bbox,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load one viewport, then answer clicks against the loaded features
    View {
        /// Map center: lon,lat
        #[arg(
            long,
            value_parser = parse_pair,
            default_value = "-118.24,34.05",
            allow_hyphen_values = true
        )]
        center: (f64, f64),

        #[arg(long, default_value_t = 9.0)]
        zoom: f64,

        /// Viewport size in pixels: WIDTHxHEIGHT
        #[arg(long, value_parser = parse_size, default_value = "1024x768")]
        size: [u32; 2],

        /// Pixel to hit-test: x,y (repeatable)
        #[arg(long = "click", value_parser = parse_pair, allow_hyphen_values = true)]
        clicks: Vec<(f64, f64)>,

        /// Switch loading off after the clicks, clearing the features
        #[arg(long)]
        disable_after_load: bool,
    },

    /// Run a single search and list the decoded features
    Search {
        /// Bounding box: minLon,minLat,maxLon,maxLat
        #[arg(long, allow_hyphen_values = true)]
        bbox: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let cfg = load_config(&args)?;
    let fetcher = HttpFeatureFetcher::from_config(&cfg);
    info!(base_url = %cfg.base_url, strategy = ?cfg.strategy, "layer configured");

    match args.command {
        Command::View {
            center,
            zoom,
            size,
            clicks,
            disable_after_load,
        } => view(&cfg, &fetcher, center, zoom, size, &clicks, disable_after_load).await?,
        Command::Search { bbox } => search(&fetcher, &bbox).await?,
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<LayerConfig, Box<dyn std::error::Error>> {
    let mut cfg = match &args.config {
        Some(path) => LayerConfig::from_path(path)?,
        None => LayerConfig::default(),
    };
    if let Some(url) = &args.base_url {
        cfg.base_url = url.clone();
    }
    if let Some(path) = &args.search_path {
        cfg.search_path = path.clone();
    }
    match args.mode {
        Some(Mode::Bbox) => cfg.strategy = StrategyMode::Bbox,
        Some(Mode::Tiled) if !matches!(cfg.strategy, StrategyMode::Tiled { .. }) => {
            cfg.strategy = StrategyMode::default();
        }
        _ => {}
    }
    cfg.validate()?;
    Ok(cfg)
}

async fn view(
    cfg: &LayerConfig,
    fetcher: &HttpFeatureFetcher,
    center: (f64, f64),
    zoom: f64,
    size: [u32; 2],
    clicks: &[(f64, f64)],
    disable_after_load: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut pipeline = LoadingPipeline::from_config(cfg)?;
    let viewport = Viewport::from_lon_lat(Vec2::new(center.0, center.1), zoom, size)?;

    let tasks = pipeline.on_viewport_change(viewport.extent(), viewport.resolution);
    let report = run_tasks(&mut pipeline, fetcher, tasks).await;
    if let Some(notice) = report.notice() {
        eprintln!("{notice}");
    }
    println!(
        "loaded {} features from {} regions ({} failed)",
        pipeline.store().len(),
        report.requested,
        report.failures.len()
    );

    for &(x, y) in clicks {
        let hits = pipeline.hit_test(&viewport, Vec2::new(x, y));
        println!("click {x},{y}: {} hit(s)", hits.len());
        for row in describe(&hits) {
            println!("  {row}");
        }
    }

    if disable_after_load {
        pipeline.set_loading_enabled(false);
        println!("loading disabled; {} features kept", pipeline.store().len());
    }
    Ok(())
}

async fn search(fetcher: &HttpFeatureFetcher, bbox: &str) -> Result<(), Box<dyn std::error::Error>> {
    let extent = parse_bbox(bbox)?;
    let features = fetcher.fetch(extent).await?;
    for f in &features {
        let start = f.attributes.start.as_deref().unwrap_or("-");
        println!("{}\t{}\t{} min.", f.id, start, f.attributes.duration_minutes);
    }
    info!(count = features.len(), "search finished");
    Ok(())
}

fn parse_pair(s: &str) -> Result<(f64, f64), String> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| format!("expected two comma-separated numbers, got {s:?}"))?;
    let a = a.trim().parse::<f64>().map_err(|e| format!("{a:?}: {e}"))?;
    let b = b.trim().parse::<f64>().map_err(|e| format!("{b:?}: {e}"))?;
    Ok((a, b))
}

fn parse_size(s: &str) -> Result<[u32; 2], String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let w = w.trim().parse::<u32>().map_err(|e| format!("{w:?}: {e}"))?;
    let h = h.trim().parse::<u32>().map_err(|e| format!("{h:?}: {e}"))?;
    if w == 0 || h == 0 {
        return Err("viewport size must be non-zero".to_string());
    }
    Ok([w, h])
}

#[cfg(test)]
mod tests {
    use super::{Args, parse_pair, parse_size};
    use clap::Parser;

    #[test]
    fn parses_pairs_and_sizes() {
        assert_eq!(parse_pair("-118.24, 34.05"), Ok((-118.24, 34.05)));
        assert!(parse_pair("1").is_err());
        assert_eq!(parse_size("800x600"), Ok([800, 600]));
        assert!(parse_size("0x600").is_err());
        assert!(parse_size("800").is_err());
    }

    #[test]
    fn view_defaults_to_los_angeles() {
        let args = Args::try_parse_from(["trajectories", "view", "--click", "10,20", "--click", "5,5"])
            .expect("parse");
        let super::Command::View {
            center,
            zoom,
            size,
            clicks,
            disable_after_load,
        } = args.command
        else {
            panic!("expected view");
        };
        assert_eq!(center, (-118.24, 34.05));
        assert_eq!(zoom, 9.0);
        assert_eq!(size, [1024, 768]);
        assert_eq!(clicks, vec![(10.0, 20.0), (5.0, 5.0)]);
        assert!(!disable_after_load);
    }

    #[test]
    fn negative_coordinates_are_values_not_flags() {
        let args = Args::try_parse_from(["trajectories", "search", "--bbox", "-119.0,33.5,-117.5,34.6"])
            .expect("parse");
        let super::Command::Search { bbox } = args.command else {
            panic!("expected search");
        };
        assert_eq!(bbox, "-119.0,33.5,-117.5,34.6");

        let args = Args::try_parse_from([
            "trajectories",
            "view",
            "--center",
            "-122.42,37.77",
            "--click",
            "-1,5",
        ])
        .expect("parse");
        let super::Command::View { center, clicks, .. } = args.command else {
            panic!("expected view");
        };
        assert_eq!(center, (-122.42, 37.77));
        assert_eq!(clicks, vec![(-1.0, 5.0)]);
    }
}
