use std::sync::Arc;

use careercompass_api::{build_router, state::AppState};
use careercompass_config::Settings;
use careercompass_db::{connect, indexes::ensure_indexes};
use careercompass_services::storage::sweep::sweep_orphaned_chat_uploads;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "careercompass_api=debug,careercompass_services=debug,careercompass_db=debug,tower_http=debug"
                .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config
    let settings = Settings::load()?;
    info!(
        "Starting CareerCompass API on {}:{}",
        settings.app.host, settings.app.port
    );

    // Connect to MongoDB
    let db = connect(&settings).await?;

    // Ensure indexes
    ensure_indexes(&db).await?;

    // Build app state
    let app_state = AppState::new(db.clone(), settings.clone());

    // Reconciliation sweep for orphaned chat uploads. The handle must stay
    // alive for the jobs to keep firing.
    let _scheduler = if settings.sweep.enabled {
        let sched = JobScheduler::new().await?;
        let store = Arc::clone(&app_state.object_store);
        let messages = Arc::clone(&app_state.messages);
        let min_age_hours = settings.sweep.min_age_hours;

        let job = Job::new_async(settings.sweep.schedule.as_str(), move |_id, _sched| {
            let store = Arc::clone(&store);
            let messages = Arc::clone(&messages);
            Box::pin(async move {
                if let Err(err) =
                    sweep_orphaned_chat_uploads(&store, &messages, min_age_hours).await
                {
                    error!(%err, "Orphaned upload sweep failed");
                }
            })
        })?;
        sched.add(job).await?;
        sched.start().await?;
        info!(schedule = %settings.sweep.schedule, "Orphan sweep scheduled");
        Some(sched)
    } else {
        None
    };

    // Build router
    let app = build_router(app_state);

    // Start server
    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
