use bolibana::{
    config::{database, settings},
    core::{calendar::PeriodType, period, reporting},
    errors::Result,
};
use chrono::Utc;
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const MEMOIZED_PERIOD_TYPES: [PeriodType; 5] = [
    PeriodType::Day,
    PeriodType::Week,
    PeriodType::Month,
    PeriodType::Quarter,
    PeriodType::Year,
];

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal: env vars can be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application settings
    let config = settings::load_default_config()
        .inspect_err(|e| error!("Critical error loading configuration: {}", e))?;

    // 4. Connect and create tables
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed reference data
    settings::seed(&db, &config)
        .await
        .inspect_err(|e| error!("Failed to seed configuration: {}", e))?;

    // 6. Memoize the current periods
    let now = Utc::now().naive_utc();
    for period_type in MEMOIZED_PERIOD_TYPES {
        let current = period::find_or_create_by_date(&db, period_type, now).await?;
        let calendar = period::to_period(&current)?;
        info!("Current {} period: {}", period_type, calendar.full_name());
    }

    // 7. Expected reportings for today
    let summary = reporting::generate_expected_reportings(&db, now)
        .await
        .inspect_err(|e| error!("Failed to generate expected reportings: {}", e))?;
    info!(
        "Maintenance done: {} schedules, {} expected reportings created.",
        summary.scheduled, summary.created
    );

    Ok(())
}
