use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use sunshine_core::{AppError, Config, ConfigError};
use sunshine_data::preferences::{PREF_LOCATION, PREF_UNITS};
use sunshine_data::{select_today_onwards, weather_uri, SortOrder, WeatherDatabase, WeatherEntry};
use sunshine_sync::{SyncError, SyncHandle, SyncOutcome, SyncService, SyncTask};
use sunshine_weather::dates::{friendly_date_string, normalized_from_date};
use sunshine_weather::format::{
    description_for_weather_id, format_high_low, format_humidity, format_pressure, format_wind,
};
use sunshine_weather::UnitSystem;

#[derive(Debug, Parser)]
#[command(name = "sunshine", version, about = "Multi-day weather forecast")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch the forecast now and replace the stored one
    Sync,
    /// List stored days from today onwards
    Forecast,
    /// Show one day in full (YYYY-MM-DD)
    Detail { date: NaiveDate },
    /// Change the forecast location and resync
    Location { value: String },
    /// Change display units
    Units { units: Units },
    /// Keep the forecast current until Ctrl-C
    Watch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Units {
    Metric,
    Imperial,
}

impl From<Units> for UnitSystem {
    fn from(units: Units) -> Self {
        match units {
            Units::Metric => UnitSystem::Metric,
            Units::Imperial => UnitSystem::Imperial,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    sunshine_core::init()?;
    let (config, _) = Config::load_validated().inspect_err(|e| {
        if let Some(config_err) = e.downcast_ref::<ConfigError>() {
            eprintln!("{}", config_err.user_message());
        }
    })?;

    let db_path = config.storage.effective_database_path();
    let db = WeatherDatabase::open(&db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?
        .into_shared();
    let task = SyncTask::from_config(&config, db).map_err(AppError::from)?;
    let service = SyncService::new(Arc::new(task));

    match cli.command {
        Command::Sync => {
            report_sync(service.start_immediate_sync()).await?;
            print_forecast(&service)?;
        }
        Command::Forecast => print_forecast(&service)?,
        Command::Detail { date } => print_detail(&service, date)?,
        Command::Location { value } => {
            service.task().preferences().set_location(value.trim())?;
            if let Some(handle) = service.on_preference_changed(PREF_LOCATION)? {
                report_sync(handle).await?;
            }
            print_forecast(&service)?;
        }
        Command::Units { units } => {
            service.task().preferences().set_units(units.into())?;
            service.on_preference_changed(PREF_UNITS)?;
            println!("Units set to {}", UnitSystem::from(units));
        }
        Command::Watch => watch(&service, &config).await?,
    }

    Ok(())
}

async fn report_sync(handle: SyncHandle) -> Result<()> {
    match handle.await? {
        Ok(SyncOutcome::Updated(days)) => println!("Stored {} days", days),
        Ok(SyncOutcome::NoData) => println!("No forecast available, keeping stored data"),
        Err(e) => print_sync_error(e),
    }
    Ok(())
}

fn print_sync_error(err: SyncError) {
    let err = AppError::from(err);
    tracing::error!("{}", err);
    eprintln!("{}", err.user_message());
}

fn print_forecast(service: &SyncService) -> Result<()> {
    let task = service.task();
    let units = task.preferences().units()?;
    let now = Local::now();

    let rows = task.provider().query(
        &weather_uri(),
        select_today_onwards(&now),
        SortOrder::DateAscending,
    )?;

    if rows.is_empty() {
        println!("No forecast stored. Run `sunshine sync`.");
        return Ok(());
    }

    let place = match task.preferences().city_name()? {
        Some(name) => name,
        None => task.preferences().preferred_location()?,
    };
    println!("{}", place);

    for (i, entry) in rows.iter().enumerate() {
        let values = &entry.values;
        println!(
            "  {:<22} {:<20} {}",
            friendly_date_string(values.date, i == 0, &now),
            description_for_weather_id(values.weather_id),
            format_high_low(values.max, values.min, units),
        );
    }
    Ok(())
}

fn print_detail(service: &SyncService, date: NaiveDate) -> Result<()> {
    let task = service.task();
    let units = task.preferences().units()?;

    let entry = task.provider().query_date(normalized_from_date(date))?;
    let Some(WeatherEntry { values, .. }) = entry else {
        println!("Nothing stored for {}", date);
        return Ok(());
    };

    println!("{}", friendly_date_string(values.date, true, &Local::now()));
    let condition = values.condition();
    println!(
        "  {} ({}, {})",
        description_for_weather_id(values.weather_id),
        condition.description(),
        condition.icon_name()
    );
    println!("  {}", format_high_low(values.max, values.min, units));
    println!("  Humidity: {}", format_humidity(values.humidity));
    println!("  Pressure: {}", format_pressure(values.pressure));
    println!("  Wind: {}", format_wind(values.wind_speed, values.degrees, units));
    Ok(())
}

async fn watch(service: &SyncService, config: &Config) -> Result<()> {
    let minutes = config.sync.interval_minutes;
    anyhow::ensure!(minutes > 0, "Periodic sync is disabled (sync.interval_minutes = 0)");

    let mut changes = service.task().provider().subscribe();
    let forecast_uri = weather_uri();
    let cancel = CancellationToken::new();

    if let Some(handle) = service.initialize()? {
        report_sync(handle).await?;
    }
    print_forecast(service)?;

    let periodic =
        service.schedule_periodic(Duration::from_secs(u64::from(minutes) * 60), cancel.clone());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                cancel.cancel();
                break;
            }
            event = changes.recv() => match event {
                Ok(event) if event.uri.is_descendant_of(&forecast_uri) => print_forecast(service)?,
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => print_forecast(service)?,
                Err(RecvError::Closed) => break,
            },
        }
    }

    periodic.await?;
    Ok(())
}
