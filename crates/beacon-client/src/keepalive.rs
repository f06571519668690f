use std::future::Future;
use std::time::Duration;

use beacon_core::Instance;
use tokio::time::{self, MissedTickBehavior};

use crate::client::RegistryClient;
use crate::errors::ClientError;

/// Result of a single successful keep-alive round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    Renewed,
    /// The registry had dropped the lease and the instance was registered again.
    Reregistered,
}

/// Drives [`RegistryClient::heartbeat`] on a timer for one instance.
pub struct KeepAlive {
    client: RegistryClient,
    instance: Instance,
    interval: Duration,
}

impl KeepAlive {
    /// Beats at the instance's lease renewal interval.
    pub fn new(client: RegistryClient, instance: Instance) -> Self {
        let interval = instance.lease_info.renewal_interval();
        Self {
            client,
            instance,
            interval,
        }
    }

    /// A zero interval is ignored.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.interval = interval;
        }
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub async fn beat(&self) -> Result<Beat, ClientError> {
        let app = &self.instance.app;
        let instance_id = &self.instance.instance_id;

        match self.client.heartbeat(app, instance_id).await {
            Ok(()) => Ok(Beat::Renewed),
            Err(ClientError::InstanceNotFound) => {
                tracing::info!(%app, %instance_id, "lease lost, registering again");
                self.client.register(&self.instance).await?;
                Ok(Beat::Reregistered)
            }
            Err(err) => Err(err),
        }
    }

    /// Beats every interval until `shutdown` resolves and returns how many
    /// beats were attempted. The first beat happens one interval in, since
    /// the caller has just registered.
    pub async fn run<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        tokio::pin!(shutdown);
        let mut beats = 0;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    beats += 1;
                    if let Err(err) = self.beat().await {
                        // the lease survives missed beats until durationInSecs runs out
                        tracing::warn!(
                            app = %self.instance.app,
                            instance_id = %self.instance.instance_id,
                            error = %err,
                            "heartbeat failed"
                        );
                    }
                }
            }
        }

        tracing::info!(beats, "keep-alive stopped");
        beats
    }
}
