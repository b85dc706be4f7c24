use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cropwatch_auth::{
    AuthClient, AuthorizedHttpClient, FileTokenBackend, HttpError, SessionTokenStore,
};
use cropwatch_core::{AppError, Config, LocationSource, NetworkError};
use cropwatch_services::{
    spawn_dashboard_polling, DashboardDataAggregator, DashboardServiceMessage, ErrorKind,
    TickOutcome, RECENT_WINDOW,
};
use cropwatch_weather::{
    fetch_weather_report, IpLocationSensor, LocationResolver, LocationSensor, UnavailableSensor,
    WeatherClient, WeatherReport, DISPLAY_FORECAST_DAYS,
};
use tokio::sync::mpsc;

const EMAIL_VAR: &str = "CROPWATCH_EMAIL";
const PASSWORD_VAR: &str = "CROPWATCH_PASSWORD";

#[tokio::main]
async fn main() -> Result<()> {
    cropwatch_core::init()?;

    let (config, _) = Config::load_validated()
        .map_err(|e| anyhow::anyhow!("{} ({})", e.user_message(), e))?;
    tracing::info!("Sensor server: {}", config.server.base_url);

    let backend = Arc::new(FileTokenBackend::new(config.token_file()));
    let session = Arc::new(SessionTokenStore::with_backend(backend));
    let http = AuthorizedHttpClient::new(
        &config.server.base_url,
        Duration::from_secs(config.server.request_timeout_secs),
        session.clone(),
    )?;

    if !session.is_signed_in() {
        sign_in(&AuthClient::new(http.clone())).await?;
    }

    tokio::spawn(show_weather(config.clone()));

    let aggregator = Arc::new(DashboardDataAggregator::new(http));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = spawn_dashboard_polling(
        aggregator,
        Duration::from_millis(config.dashboard.poll_interval_ms),
        tx,
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                }
                tracing::info!("Shutting down");
                break;
            }
            message = rx.recv() => match message {
                Some(DashboardServiceMessage::TickDone(outcome)) => {
                    if report_tick(&outcome) {
                        tracing::warn!("Sign in again with {} and {} set", EMAIL_VAR, PASSWORD_VAR);
                        break;
                    }
                }
                None => break,
            },
        }
    }

    handle.stop().await;
    Ok(())
}

async fn sign_in(auth: &AuthClient) -> Result<()> {
    let (Ok(email), Ok(password)) = (std::env::var(EMAIL_VAR), std::env::var(PASSWORD_VAR)) else {
        let err = AppError::Auth(cropwatch_core::AuthError::NotSignedIn);
        anyhow::bail!("{} Set {} and {}.", err.user_message(), EMAIL_VAR, PASSWORD_VAR);
    };

    auth.login(&email, &password).await.map_err(|e| {
        let err = auth_error(e);
        anyhow::anyhow!("{} ({})", err.user_message(), err)
    })?;

    tracing::info!("Signed in as {}", email);
    Ok(())
}

async fn show_weather(config: Config) {
    let request_timeout = Duration::from_secs(config.weather.request_timeout_secs);
    let sensor: Arc<dyn LocationSensor> = match config.weather.location_source {
        LocationSource::Ip => match IpLocationSensor::new(request_timeout) {
            Ok(sensor) => Arc::new(sensor),
            Err(e) => {
                tracing::warn!("IP location unavailable: {}", e);
                Arc::new(UnavailableSensor)
            }
        },
        LocationSource::None => Arc::new(UnavailableSensor),
    };
    let resolver = LocationResolver::new(
        sensor,
        Duration::from_secs(config.weather.location_timeout_secs),
    );

    let client = match WeatherClient::new_with_url(
        &config.weather.api_url,
        config.weather.forecast_days,
        request_timeout,
    )
    .context("Failed to create weather client")
    {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("{:#}", e);
            return;
        }
    };

    match fetch_weather_report(&resolver, &client, DISPLAY_FORECAST_DAYS).await {
        Ok(report) => log_weather(&report),
        Err(e) => {
            let err = AppError::Weather(cropwatch_core::WeatherError::FetchFailed(e.to_string()));
            tracing::warn!("{} ({})", err.user_message(), err);
        }
    }
}

fn log_weather(report: &WeatherReport) {
    if let Some(notice) = report.notice {
        tracing::info!("{}", notice);
    }

    let current = &report.current;
    tracing::info!(
        "Weather: {} [{}], {:.1}°C, humidity {:.0}%, wind {:.1} km/h, UV {:.1}",
        current.classification.description,
        current.icon.icon_name(),
        current.conditions.temperature,
        current.conditions.humidity,
        current.conditions.wind_speed,
        current.conditions.uv_index
    );
    for day in &report.days {
        tracing::info!(
            "  {}: {} [{}], {:.0}° / {:.0}°",
            day.date.format("%a %d %b"),
            day.classification.description,
            day.icon.icon_name(),
            day.temp_max,
            day.temp_min
        );
    }
}

/// Log one tick. Returns true when the session has ended.
fn report_tick(outcome: &TickOutcome) -> bool {
    if let Some(snapshot) = &outcome.snapshot {
        let level = snapshot.stress_level();
        let sensors = &snapshot.sensor_values;
        tracing::info!(
            "CSI {:.1} ({}, {}) | {} | {:.1}°C {:.0}% soil {:.0} light {:.0} water {:.1} | security: {}",
            snapshot.csi,
            level.label(),
            level.color(),
            snapshot.primary_stress_factor,
            sensors.temperature,
            sensors.humidity,
            sensors.soil_moisture,
            sensors.light_intensity,
            sensors.water_level,
            sensors.security_status().label()
        );
    }

    if let Some(history) = &outcome.history {
        for point in history.recent(RECENT_WINDOW) {
            tracing::debug!(
                "  {} csi {:.1} temp {:.1} humidity {:.0}",
                point.time,
                point.csi,
                point.temperature,
                point.humidity
            );
        }
    }

    match &outcome.error {
        Some(kind) => {
            let err = tick_error(kind);
            tracing::warn!("{} ({})", err.user_message(), err);
            err.requires_login()
        }
        None => false,
    }
}

fn tick_error(kind: &ErrorKind) -> AppError {
    match kind {
        ErrorKind::AuthExpired => cropwatch_core::AuthError::SessionExpired.into(),
        ErrorKind::NetworkFailure { error, .. } => error.clone().into(),
        ErrorKind::ServerError { status, .. } => NetworkError::ServerError {
            status: *status,
            message: kind.to_string(),
        }
        .into(),
        ErrorKind::InvalidResponse { message, .. } => {
            NetworkError::InvalidResponse(message.clone()).into()
        }
    }
}

fn auth_error(e: cropwatch_auth::AuthError) -> AppError {
    match e {
        cropwatch_auth::AuthError::InvalidCredentials(_) => {
            cropwatch_core::AuthError::InvalidCredentials.into()
        }
        cropwatch_auth::AuthError::Rejected(message) => {
            cropwatch_core::AuthError::RegistrationRejected(message).into()
        }
        cropwatch_auth::AuthError::Http(HttpError::Unauthorized) => {
            cropwatch_core::AuthError::SessionExpired.into()
        }
        cropwatch_auth::AuthError::Http(HttpError::NetworkFailure(error)) => error.into(),
        cropwatch_auth::AuthError::Http(HttpError::ServerError { status, message }) => {
            NetworkError::ServerError { status, message }.into()
        }
        cropwatch_auth::AuthError::Http(HttpError::InvalidResponse(message)) => {
            NetworkError::InvalidResponse(message).into()
        }
    }
}
