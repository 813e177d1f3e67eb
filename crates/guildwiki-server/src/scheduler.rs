//! Background job scheduler.
//!
//! Runs the admin session sweep on a fixed interval.

use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::sessions::SessionStore;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, a
/// job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(sessions: SessionStore) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_session_sweep_job(&scheduler, sessions).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_session_sweep_job(
    scheduler: &JobScheduler,
    sessions: SessionStore,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_repeated_async(SESSION_SWEEP_INTERVAL, move |_uuid, _lock| {
        let sessions = sessions.clone();
        Box::pin(async move {
            let removed = sessions.sweep().await;
            if removed > 0 {
                tracing::debug!(removed, "scheduler: swept expired admin sessions");
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
