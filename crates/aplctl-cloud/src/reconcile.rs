//! Cluster resource reconciliation
//!
//! Deleting a managed cluster leaves its block storage volumes and load
//! balancers behind. Volumes are only discoverable through the label of the
//! node they are attached to, which disappears with the cluster, so matching
//! volumes are tagged with a recovery tag before the cluster is deleted. A
//! later run (after a crash, or a second `destroy`) finds them by that tag.

use crate::error::Result;
use crate::provider::{ResourceApi, RetryConfig, Volume};
use crate::report::CleanupReport;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Derived identifier shared by every node and load balancer of a cluster
pub fn cluster_label(cluster_id: u64) -> String {
    format!("lke{}", cluster_id)
}

/// Timing knobs for cleanup
///
/// Fixed delays stand in for polling the provider until detachment settles.
#[derive(Debug, Clone)]
pub struct CleanupSettings {
    /// Wait after deleting the cluster
    pub settle_delay: Duration,

    /// Wait between detaching and deleting a volume
    pub detach_delay: Duration,

    /// Retry policy for the provider client (HTTP 400 while still attached)
    pub retry: RetryConfig,
}

impl CleanupSettings {
    /// No waiting at all; used in tests
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            detach_delay: Duration::ZERO,
            retry: RetryConfig::none(),
        }
    }
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(10),
            detach_delay: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }
}

/// Removes a cluster and everything it left behind
pub struct ClusterReaper<'a> {
    api: &'a dyn ResourceApi,
    recovery_tag: String,
    settings: CleanupSettings,
}

impl<'a> ClusterReaper<'a> {
    pub fn new(api: &'a dyn ResourceApi, recovery_tag: impl Into<String>) -> Self {
        Self {
            api,
            recovery_tag: recovery_tag.into(),
            settings: CleanupSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: CleanupSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn recovery_tag(&self) -> &str {
        &self.recovery_tag
    }

    /// Delete the cluster, its volumes and its load balancers.
    ///
    /// Safe to run repeatedly: resources that are already gone are reported
    /// as skipped.
    pub async fn purge_cluster_resources(&self, cluster_id: u64) -> Result<CleanupReport> {
        let start = Instant::now();
        let mut report = CleanupReport::new();
        let label = cluster_label(cluster_id);

        // The volume list has to be built before the cluster goes away.
        let volumes = self.api.list_volumes().await.inspect_err(|e| {
            tracing::error!("list volumes: {}", e);
        })?;
        let targets = self.select_volumes(&volumes, &label, &mut report).await?;

        self.delete_cluster(cluster_id, &mut report).await?;

        let total = targets.len();
        for (idx, volume) in targets.iter().enumerate() {
            tracing::info!("({}/{}) purging volume {}", idx + 1, total, volume.id);
            self.purge_volume(volume, &mut report).await?;
        }

        let balancers = self.delete_node_balancers(cluster_id).await?;
        report.merge(balancers);

        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Delete every load balancer whose label contains the cluster label
    pub async fn delete_node_balancers(&self, cluster_id: u64) -> Result<CleanupReport> {
        let start = Instant::now();
        let mut report = CleanupReport::new();
        let label = cluster_label(cluster_id);

        let balancers = self.api.list_node_balancers().await.inspect_err(|e| {
            tracing::error!("list nodebalancers: {}", e);
        })?;

        for nb in balancers.iter().filter(|nb| nb.label_contains(&label)) {
            let step = format!("delete-nodebalancer-{}", nb.id);
            match self.api.delete_node_balancer(nb.id).await {
                Ok(()) => report.add_success(step, format!("deleted nodebalancer {}", nb.id)),
                Err(e) if e.is_not_found() => {
                    report.add_skipped(step, format!("nodebalancer {} already gone", nb.id))
                }
                Err(e) => {
                    tracing::error!("delete nodebalancer {}: {}", nb.id, e);
                    return Err(e);
                }
            }
        }

        tracing::info!("purged nodebalancers for {}", label);
        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Pick the volumes to delete, tagging fresh matches for later recovery.
    async fn select_volumes(
        &self,
        volumes: &[Volume],
        label: &str,
        report: &mut CleanupReport,
    ) -> Result<Vec<Volume>> {
        let attached: Vec<Volume> = volumes
            .iter()
            .filter(|v| v.attached_to(label))
            .cloned()
            .collect();

        if attached.is_empty() {
            let recovered: Vec<Volume> = volumes
                .iter()
                .filter(|v| v.has_tag(&self.recovery_tag))
                .cloned()
                .collect();
            if !recovered.is_empty() {
                tracing::info!(
                    "recovered {} volumes by tag {}",
                    recovered.len(),
                    self.recovery_tag
                );
            }
            return Ok(recovered);
        }

        for volume in attached.iter().filter(|v| !v.has_tag(&self.recovery_tag)) {
            let mut tags = volume.tags.clone();
            tags.push(self.recovery_tag.clone());
            self.api
                .tag_volume(volume.id, &tags)
                .await
                .inspect_err(|e| tracing::error!("tagging volume {}: {}", volume.id, e))?;
            report.add_success(
                format!("tag-volume-{}", volume.id),
                format!("tagged volume {} with {}", volume.id, self.recovery_tag),
            );
        }

        Ok(attached)
    }

    async fn delete_cluster(&self, cluster_id: u64, report: &mut CleanupReport) -> Result<()> {
        let step = format!("delete-cluster-{}", cluster_id);
        match self.api.delete_cluster(cluster_id).await {
            Ok(()) => {
                tracing::info!("purged lke cluster {}", cluster_id);
                report.add_success(step, format!("deleted cluster {}", cluster_id));
                sleep(self.settings.settle_delay).await;
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::info!("lke cluster {} already deleted", cluster_id);
                report.add_skipped(step, format!("cluster {} already gone", cluster_id));
                Ok(())
            }
            Err(e) => {
                tracing::error!("delete lke cluster {}: {}", cluster_id, e);
                Err(e)
            }
        }
    }

    async fn purge_volume(&self, volume: &Volume, report: &mut CleanupReport) -> Result<()> {
        match self.api.detach_volume(volume.id).await {
            Ok(()) => sleep(self.settings.detach_delay).await,
            Err(e) if e.is_already_detached() => {
                tracing::debug!("volume {} already detached", volume.id);
            }
            Err(e) => {
                tracing::error!("detach volume {}: {}", volume.id, e);
                return Err(e);
            }
        }

        let step = format!("delete-volume-{}", volume.id);
        match self.api.delete_volume(volume.id).await {
            Ok(()) => {
                report.add_success(step, format!("deleted volume {}", volume.id));
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                report.add_skipped(step, format!("volume {} already gone", volume.id));
                Ok(())
            }
            Err(e) => {
                tracing::error!("delete volume {}: {}", volume.id, e);
                Err(e)
            }
        }
    }
}
