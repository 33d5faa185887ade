use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aqi_monitor::api::{ApiClient, NewSensor, Session};
use aqi_monitor::common::AppState;
use aqi_monitor::config::Config;
use aqi_monitor::error::AppError;
use aqi_monitor::registry::{CommandOutcome, Operator, SensorRegistry};
use aqi_monitor::simulation::{ROSTER, SeverityLevel, Simulator, find_sensor};
use aqi_monitor::trends::{self, TrendDashboard, TrendState};

#[derive(Parser)]
#[command(version, about = "Air-quality sensor simulator and trends console")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the simulator and the trends refresh until interrupted
    Run,
    /// Manage registered sensor nodes
    Sensors {
        #[command(subcommand)]
        action: SensorAction,
    },
    /// Run one trends cycle and print the report
    Trends {
        /// Region to report on (defaults to TRENDS_REGION_ID)
        #[arg(long)]
        region: Option<i32>,
    },
    /// Generate and score a single simulated reading
    Predict {
        /// Roster sensor to simulate (random when omitted)
        #[arg(long)]
        sensor_id: Option<i32>,
        /// Severity profile overriding the sensor's own
        #[arg(long)]
        level: Option<String>,
    },
}

#[derive(Subcommand)]
enum SensorAction {
    List,
    Add {
        sensor_code: String,
        latitude: f64,
        longitude: f64,
        #[arg(long, default_value_t = 1)]
        region_id: i32,
        #[arg(long, default_value_t = 20)]
        radius: u32,
    },
    Toggle {
        sensor_id: i32,
    },
    Delete {
        sensor_id: i32,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aqi_monitor=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration (fail-fast)
    let config = Config::from_env().map_err(AppError::from)?;
    tracing::info!(
        base_url = %config.api_base_url,
        region_id = config.trends_region_id,
        interval_ms = config.simulation_interval_ms,
        "Configuration loaded"
    );

    let api_client = ApiClient::new(&config)?;
    let state = AppState::new(config, api_client);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_dashboard(state).await,
        Command::Sensors { action } => run_sensors(state, action).await,
        Command::Trends { region } => {
            let region_id = region.unwrap_or(state.config.trends_region_id);
            let outcome = trends::run_cycle(state.api_client.as_ref(), region_id).await;
            print_trend_state(&outcome)
        }
        Command::Predict { sensor_id, level } => run_predict(state, sensor_id, level).await,
    }
}

async fn sign_in(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    if let Some((username, password)) = state.config.credentials() {
        state.api_client.login(username, password).await?;
    } else if !state.api_client.session().is_authenticated() {
        tracing::warn!("No admin token or credentials configured; admin requests will be rejected");
    }
    Ok(())
}

async fn run_dashboard(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let simulator = Simulator::new(
        Arc::clone(&state.api_client),
        state.live_feed.clone(),
        state.config.simulation_interval(),
    );
    if state.config.simulation_autostart {
        simulator.start();
    }

    let mut dashboard = TrendDashboard::start(
        Arc::clone(&state.api_client),
        state.live_feed.clone(),
        state.config.trends_region_id,
        state.config.trends_refresh_interval(),
    );
    let mut live = state.live_feed.subscribe();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            Some(trend) = dashboard.changed() => {
                log_trend_state(&trend);
                let particulates = dashboard.particulate_series();
                if let Some(latest) = particulates.last() {
                    tracing::debug!(
                        points = particulates.len(),
                        pm25 = latest.pm25,
                        pm10 = latest.pm10,
                        "Particulate series refreshed"
                    );
                }
            }
            Ok(()) = live.changed() => {
                let snapshot = live.borrow_and_update().clone();
                if let Some(newest) = snapshot.readings.first() {
                    tracing::info!(
                        sensor_id = newest.reading.sensor_id,
                        region = %newest.reading.region_name,
                        aqi = newest.aqi,
                        category = %newest.category,
                        buffered = snapshot.readings.len(),
                        "Live reading"
                    );
                }
            }
        }
    }

    simulator.stop();
    drop(dashboard);
    tracing::info!("Dashboard shut down gracefully");
    Ok(())
}

async fn run_sensors(
    state: AppState,
    action: SensorAction,
) -> Result<(), Box<dyn std::error::Error>> {
    sign_in(&state).await?;

    let assume_yes = matches!(action, SensorAction::Delete { yes: true, .. });
    let operator = ConsoleOperator {
        session: state.api_client.session(),
        assume_yes,
    };
    let mut registry = SensorRegistry::new(state.api_client.as_ref(), operator);

    let outcome = match action {
        SensorAction::List => registry.load().await,
        SensorAction::Add {
            sensor_code,
            latitude,
            longitude,
            region_id,
            radius,
        } => {
            let form = NewSensor {
                sensor_code,
                region_id,
                latitude,
                longitude,
                radius,
            };
            registry.create(form).await
        }
        SensorAction::Toggle { sensor_id } => {
            // Toggle flips the listed flag, so the table must be loaded first.
            registry.load().await;
            registry.toggle(sensor_id).await
        }
        SensorAction::Delete { sensor_id, .. } => registry.delete(sensor_id).await,
    };

    println!("{}", serde_json::to_string_pretty(registry.sensors())?);

    match outcome {
        CommandOutcome::Failed => Err("sensor command failed".into()),
        CommandOutcome::Applied | CommandOutcome::Cancelled => Ok(()),
    }
}

async fn run_predict(
    state: AppState,
    sensor_id: Option<i32>,
    level: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let sensor = match sensor_id {
        Some(id) => find_sensor(id).ok_or_else(|| format!("no simulated sensor with id {id}"))?,
        None => {
            let index = rand::random_range(0..ROSTER.len());
            ROSTER[index]
        }
    };
    let sensor = match level.as_deref() {
        Some(label) => sensor.with_level(SeverityLevel::from_label(label)),
        None => sensor,
    };

    let simulator = Simulator::new(
        Arc::clone(&state.api_client),
        state.live_feed.clone(),
        state.config.simulation_interval(),
    );
    let scored = simulator.simulate_once(&sensor).await?;
    println!("{}", serde_json::to_string_pretty(&scored)?);
    Ok(())
}

fn log_trend_state(state: &TrendState) {
    match state {
        TrendState::Loading => tracing::debug!("Trends loading"),
        TrendState::NoData(reason) => tracing::warn!(reason = ?reason, "No trend data available"),
        TrendState::Ready(report) => tracing::info!(
            current_aqi = report.current_aqi,
            category = %report.current_category,
            peak_aqi = report.peak_aqi,
            trend = %report.direction,
            forecast_aqi = ?report.forecast_aqi,
            "Trends refreshed"
        ),
    }
}

fn print_trend_state(state: &TrendState) -> Result<(), Box<dyn std::error::Error>> {
    log_trend_state(state);
    match state {
        TrendState::Ready(report) => {
            println!("{}", serde_json::to_string_pretty(report)?);
            Ok(())
        }
        TrendState::Loading | TrendState::NoData(_) => Err("no trend data available".into()),
    }
}

/// Terminal-backed operator for the `sensors` commands.
struct ConsoleOperator {
    session: Arc<Session>,
    assume_yes: bool,
}

impl Operator for ConsoleOperator {
    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        print!("{message} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }

    fn alert(&self, message: &str) {
        tracing::error!("{message}");
        eprintln!("{message}");
    }

    fn force_logout(&self) {
        self.session.logout();
        tracing::warn!("Session expired or invalid; sign in again with AQI_ADMIN_USERNAME/AQI_ADMIN_PASSWORD");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        },
    }
}
