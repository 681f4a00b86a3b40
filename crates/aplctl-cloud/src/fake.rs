//! In-memory `ResourceApi` for tests

use crate::error::{CloudError, Result};
use crate::provider::{NodeBalancer, ResourceApi, Volume};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    volumes: BTreeMap<u64, Volume>,
    clusters: BTreeSet<u64>,
    node_balancers: BTreeMap<u64, NodeBalancer>,
    calls: Vec<String>,
    failures: HashMap<String, CloudError>,
}

/// Fake provider that records every call as `op:id`
#[derive(Default)]
pub struct FakeResourceApi {
    state: Mutex<State>,
}

impl FakeResourceApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_volume(self, volume: Volume) -> Self {
        self.lock().volumes.insert(volume.id, volume);
        self
    }

    pub fn with_cluster(self, cluster_id: u64) -> Self {
        self.lock().clusters.insert(cluster_id);
        self
    }

    pub fn with_node_balancer(self, nb: NodeBalancer) -> Self {
        self.lock().node_balancers.insert(nb.id, nb);
        self
    }

    /// Make the call `op:id` fail once with `error`
    pub fn fail_on(self, call: impl Into<String>, error: CloudError) -> Self {
        self.lock().failures.insert(call.into(), error);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn remaining_volume_ids(&self) -> Vec<u64> {
        self.lock().volumes.keys().copied().collect()
    }

    pub fn remaining_node_balancer_ids(&self) -> Vec<u64> {
        self.lock().node_balancers.keys().copied().collect()
    }

    pub fn has_cluster(&self, cluster_id: u64) -> bool {
        self.lock().clusters.contains(&cluster_id)
    }

    pub fn volume(&self, volume_id: u64) -> Option<Volume> {
        self.lock().volumes.get(&volume_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn record(&self, call: String) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.calls.push(call.clone());
        match state.failures.remove(&call) {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl ResourceApi for FakeResourceApi {
    fn name(&self) -> &str {
        "fake"
    }

    async fn list_volumes(&self) -> Result<Vec<Volume>> {
        let state = self.record("list_volumes".to_string())?;
        Ok(state.volumes.values().cloned().collect())
    }

    async fn tag_volume(&self, volume_id: u64, tags: &[String]) -> Result<()> {
        let mut state = self.record(format!("tag_volume:{}", volume_id))?;
        let volume = state
            .volumes
            .get_mut(&volume_id)
            .ok_or_else(|| CloudError::ResourceNotFound(format!("volume {}", volume_id)))?;
        volume.tags = tags.to_vec();
        Ok(())
    }

    async fn detach_volume(&self, volume_id: u64) -> Result<()> {
        let mut state = self.record(format!("detach_volume:{}", volume_id))?;
        let volume = state
            .volumes
            .get_mut(&volume_id)
            .ok_or_else(|| CloudError::ResourceNotFound(format!("volume {}", volume_id)))?;
        if volume.linode_id.is_none() {
            return Err(CloudError::NotAttached(volume_id));
        }
        volume.linode_id = None;
        volume.linode_label = None;
        Ok(())
    }

    async fn delete_volume(&self, volume_id: u64) -> Result<()> {
        let mut state = self.record(format!("delete_volume:{}", volume_id))?;
        state
            .volumes
            .remove(&volume_id)
            .map(|_| ())
            .ok_or_else(|| CloudError::ResourceNotFound(format!("volume {}", volume_id)))
    }

    async fn list_node_balancers(&self) -> Result<Vec<NodeBalancer>> {
        let state = self.record("list_node_balancers".to_string())?;
        Ok(state.node_balancers.values().cloned().collect())
    }

    async fn delete_node_balancer(&self, node_balancer_id: u64) -> Result<()> {
        let mut state = self.record(format!("delete_node_balancer:{}", node_balancer_id))?;
        state
            .node_balancers
            .remove(&node_balancer_id)
            .map(|_| ())
            .ok_or_else(|| {
                CloudError::ResourceNotFound(format!("nodebalancer {}", node_balancer_id))
            })
    }

    async fn delete_cluster(&self, cluster_id: u64) -> Result<()> {
        let mut state = self.record(format!("delete_cluster:{}", cluster_id))?;
        if !state.clusters.remove(&cluster_id) {
            return Err(CloudError::ResourceNotFound(format!(
                "lke cluster {}",
                cluster_id
            )));
        }
        // Cluster nodes go away with the cluster; their volumes stay attached
        // to nothing until detach catches up.
        let label = crate::reconcile::cluster_label(cluster_id);
        for volume in state.volumes.values_mut() {
            if volume.attached_to(&label) {
                volume.linode_label = None;
            }
        }
        Ok(())
    }
}
