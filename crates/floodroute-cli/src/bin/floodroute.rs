use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use floodroute_cli::{route_geometry_from_geojson, track_positions, Config, PositionFeed};
use floodroute_core::{
    acquire_start_fix, build_avoidance_geometry, classify_route, google_maps_directions_url,
    haversine_distance, Coordinate, HazardCollection, PlanningSession, ProximityMonitor,
    RoutePlanner, RouteResult, SessionState,
};
use floodroute_ors::OrsClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Flood-hazard aware route planning", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the avoidance geometry for a hazard layer
    Avoid {
        #[command(flatten)]
        hazards: HazardArgs,
    },
    /// Plan a route that avoids high-risk areas
    Plan {
        #[command(flatten)]
        hazards: HazardArgs,

        /// Start point as lat,lon
        #[arg(long)]
        start: Coordinate,

        /// End point as lat,lon
        #[arg(long)]
        end: Coordinate,

        /// Directions service base URL (overrides ORS_BASE_URL)
        #[arg(long)]
        ors_url: Option<String>,

        /// Write the route as a GeoJSON feature
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Take a start fix from a position feed and warn near high-risk areas
    Watch {
        #[command(flatten)]
        hazards: HazardArgs,

        /// Position feed with one lat,lon per line, or - for stdin
        #[arg(long, default_value = "-")]
        positions: String,

        /// Warning distance in meters (overrides FLOODROUTE_WARN_DISTANCE_M)
        #[arg(long)]
        warn_distance: Option<f64>,
    },
    /// Check a saved route against a hazard layer
    Check {
        #[command(flatten)]
        hazards: HazardArgs,

        /// Route GeoJSON file
        #[arg(long)]
        route: PathBuf,
    },
}

#[derive(Args, Debug)]
struct HazardArgs {
    /// Hazard GeoJSON FeatureCollection
    #[arg(long)]
    hazards: PathBuf,

    /// Minimum severity treated as high risk (overrides FLOODROUTE_RISK_THRESHOLD)
    #[arg(long)]
    threshold: Option<u8>,

    /// Feature property holding the severity class
    #[arg(long, default_value = floodroute_core::models::DEFAULT_SEVERITY_PROPERTY)]
    severity_property: String,
}

impl HazardArgs {
    fn load(&self) -> Result<HazardCollection> {
        let hazards = HazardCollection::from_path(&self.hazards, &self.severity_property)
            .with_context(|| format!("Failed to load hazards {}", self.hazards.display()))?;
        tracing::info!(
            "Loaded {} hazard features from {}",
            hazards.len(),
            self.hazards.display()
        );
        Ok(hazards)
    }

    fn apply(&self, config: &mut Config) {
        if let Some(threshold) = self.threshold {
            config.rules.high_risk_threshold = threshold;
        }
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter =
        tracing_subscriber::EnvFilter::from_default_env().add_directive("floodroute=info".parse()?);
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;
    let mut config = Config::from_env();

    match cli.command {
        Command::Avoid { hazards } => {
            hazards.apply(&mut config);
            let collection = hazards.load()?;
            match build_avoidance_geometry(&collection, config.rules.high_risk_threshold) {
                Some(avoidance) => {
                    println!("{}", serde_json::to_string_pretty(&avoidance.to_geojson())?)
                }
                None => println!("null"),
            }
        }
        Command::Plan {
            hazards,
            start,
            end,
            ors_url,
            output,
        } => {
            hazards.apply(&mut config);
            if let Some(url) = ors_url {
                config.ors.base_url = url;
            }
            plan(config, hazards.load()?, start, end, output).await?;
        }
        Command::Watch {
            hazards,
            positions,
            warn_distance,
        } => {
            hazards.apply(&mut config);
            if let Some(distance) = warn_distance {
                config.rules.warn_distance_m = distance;
            }
            watch(config, hazards.load()?, &positions).await?;
        }
        Command::Check { hazards, route } => {
            hazards.apply(&mut config);
            let collection = hazards.load()?;
            let text = std::fs::read_to_string(&route)
                .with_context(|| format!("Failed to read route {}", route.display()))?;
            let geometry = route_geometry_from_geojson(&text)?;
            let avoidance = build_avoidance_geometry(&collection, config.rules.high_risk_threshold);
            let checked = classify_route(RouteResult::new(Some(geometry), None), avoidance.as_ref());

            if !checked.risk_verified {
                println!("Route could not be checked against hazards.");
            } else if checked.crosses_hazard {
                println!("Route passes through high-risk flood areas.");
            } else {
                println!("Route stays clear of high-risk flood areas.");
            }
        }
    }

    Ok(())
}

async fn plan(
    config: Config,
    hazards: HazardCollection,
    start: Coordinate,
    end: Coordinate,
    output: Option<PathBuf>,
) -> Result<()> {
    let client = OrsClient::new(config.ors.clone())?;
    let planner = RoutePlanner::new(client, config.rules.clone());
    tracing::info!(
        "Using directions profile {} at {}",
        planner.directions().config().profile,
        planner.directions().config().base_url
    );

    let mut session = PlanningSession::new(config.rules);
    session.load_hazards(Arc::new(hazards));
    session.begin();
    session.set_start(start)?;
    session.set_end(end)?;

    println!(
        "Planning {} -> {} ({:.0} m straight line)",
        start,
        end,
        haversine_distance(start.lat, start.lon, end.lat, end.lon)
    );

    let state = planner.plan(&mut session).await?;
    println!("{}", session.status_line());
    if let Some(err) = session.last_error() {
        println!("Failure kind: {}", err.failure_kind().as_str());
    }

    if let (SessionState::Resolved(classification), Some(route)) = (state, session.route()) {
        if let Some(path) = output {
            let feature = serde_json::json!({
                "type": "Feature",
                "properties": {
                    "classification": classification,
                    "planned_around_hazards": classification.is_constrained(),
                    "distance_m": route.distance_m,
                    "duration_s": route.duration_s,
                    "crosses_hazard": route.crosses_hazard,
                    "risk_verified": route.risk_verified,
                },
                "geometry": route.geometry.as_ref().map(|geometry| geometry.to_geojson()),
            });
            std::fs::write(&path, serde_json::to_string_pretty(&feature)?)
                .with_context(|| format!("Failed to write route {}", path.display()))?;
            println!("Route written to {}", path.display());
        }
        println!(
            "Google Maps: {}",
            google_maps_directions_url(Some(route), start, end)
        );
    }

    Ok(())
}

async fn watch(config: Config, hazards: HazardCollection, positions: &str) -> Result<()> {
    let feed = PositionFeed::open(positions).await?;

    let mut session = PlanningSession::new(config.rules.clone());
    session.load_hazards(Arc::new(hazards));
    session.begin();

    match acquire_start_fix(&feed, &config.rules).await {
        Ok(position) => {
            session.location_fixed(position)?;
            println!("Start fixed at {}", position);
        }
        Err(err) => {
            session.location_failed(&err);
            println!("{}", err.user_message());
        }
    }
    println!("{}", session.status_line());

    if session.avoidance_snapshot().is_none() {
        println!("No high-risk areas at threshold {}.", config.rules.high_risk_threshold);
    }

    let mut monitor = ProximityMonitor::new(&config.rules);
    let warn_distance = monitor.warn_distance_m();
    let warnings = track_positions(
        feed.into_stream(),
        &mut session,
        &mut monitor,
        |position, at| {
            println!(
                "[{}] Warning: {} is within {:.0} m of a high-risk flood area",
                at.format("%H:%M:%S"),
                position,
                warn_distance
            );
        },
    )
    .await;

    match warnings {
        Ok(count) => println!("Tracking finished with {} warning(s).", count),
        Err(err) => println!("Tracking stopped: {}", err.user_message()),
    }
    if let Some(start) = session.start() {
        println!("Last start point: {}", start);
    }
    Ok(())
}
