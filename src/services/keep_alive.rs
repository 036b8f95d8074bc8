//! Cron-driven keep-alive: asks the manager to send a protocol `ping`
//! so idle proxies in front of the backend don't drop the socket.

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use crate::client::ClientHandle;
use crate::error::MonitorResult;

pub struct KeepAliveService {
    client: ClientHandle,
}

impl KeepAliveService {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }

    /// Start the keep-alive job on a custom cron schedule
    ///
    /// # Arguments
    /// * `cron_expression` - six-field cron expression (e.g. "*/30 * * * * *")
    ///
    /// The returned scheduler must be kept alive for the job to keep firing.
    pub async fn start_with_schedule(&self, cron_expression: &str) -> MonitorResult<JobScheduler> {
        let scheduler = JobScheduler::new().await?;

        let client = self.client.clone();
        let job = Job::new_async(cron_expression, move |_uuid, _l| {
            let client = client.clone();

            Box::pin(async move {
                if let Err(e) = client.ping() {
                    warn!("⚠️ [KEEP-ALIVE] Ping not queued: {}", e);
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!(
            "🔔 [KEEP-ALIVE] Cron job started with schedule: {}",
            cron_expression
        );
        Ok(scheduler)
    }
}
