pub mod cli;
pub mod core;
pub mod job;
pub mod notify;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::summary::render_fatal;
use crate::core::{Notifier, RateProvider, RateRepository, ReferenceRepository, RunSummary};
use crate::notify::SmtpNotifier;
use crate::providers::{CbrProvider, NbuProvider, util::build_client};
use crate::store::PgStore;
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tracing::{debug, error, info};

#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    pub config_path: Option<String>,
    /// Defaults to today's UTC date.
    pub date: Option<NaiveDate>,
    pub show_progress: bool,
}

/// A finished run and whether its notification went out.
#[derive(Debug)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub notification_error: Option<String>,
}

/// Loads the configuration, connects to PostgreSQL and runs the job.
pub async fn run(options: &RunOptions) -> Result<RunOutcome> {
    info!("ratekeeper starting...");

    let config = match options.config_path.as_deref() {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        database = %config.database.name,
        host = %config.database.host,
        "Loaded config"
    );

    let date = options.date.unwrap_or_else(|| Utc::now().date_naive());
    let notifier = SmtpNotifier::new(&config.email);
    run_on_database(&config, date, &notifier, options.show_progress).await
}

/// Connects to PostgreSQL and runs the job. A failed connect is reported
/// through `notifier` before the error is returned.
pub async fn run_on_database(
    config: &AppConfig,
    date: NaiveDate,
    notifier: &dyn Notifier,
    show_progress: bool,
) -> Result<RunOutcome> {
    let store = match PgStore::connect(&config.database).await {
        Ok(store) => store,
        Err(e) => {
            notify_fatal(notifier, config, date, &e).await;
            return Err(e);
        }
    };

    let result = run_with(config, date, &store, &store, notifier, show_progress).await;
    store.close().await;
    result
}

/// Runs the job against explicit storage and notifier.
pub async fn run_with(
    config: &AppConfig,
    date: NaiveDate,
    references: &dyn ReferenceRepository,
    rates: &dyn RateRepository,
    notifier: &dyn Notifier,
    show_progress: bool,
) -> Result<RunOutcome> {
    let client = build_client(config.http.timeout())?;
    let cbr = CbrProvider::new(&config.providers.cbr.base_url, client.clone());
    let nbu = NbuProvider::new(&config.providers.nbu.base_url, client);
    let providers: [&dyn RateProvider; 2] = [&cbr, &nbu];

    let ctx = job::JobContext {
        references,
        rates,
        providers: &providers,
        catch_up_days: config.catch_up_days,
        show_progress,
    };

    let summary = match job::run_job(&ctx, date).await {
        Ok(summary) => summary,
        Err(e) => {
            notify_fatal(notifier, config, date, &e).await;
            return Err(e);
        }
    };

    let subject = summary.subject(&config.email.subject);
    let notification_error = match notifier.send(&subject, &summary.render_body()).await {
        Ok(()) => None,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Failed to send notification");
            Some(format!("{e:#}"))
        }
    };

    Ok(RunOutcome {
        summary,
        notification_error,
    })
}

async fn notify_fatal(
    notifier: &dyn Notifier,
    config: &AppConfig,
    date: NaiveDate,
    err: &anyhow::Error,
) {
    let subject = format!("{} {}: FAILED", config.email.subject, date);
    if let Err(send_err) = notifier.send(&subject, &render_fatal(date, err)).await {
        error!(error = %format!("{send_err:#}"), "Failed to send failure notification");
    }
}
