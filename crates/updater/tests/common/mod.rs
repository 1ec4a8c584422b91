//! In-memory queue and cluster fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use updater::cluster::{DeploymentApi, ReleaseManager, ReleaseUpgrade};
use updater::error::{ClusterError, QueueError};
use updater::queue::{MessageQueue, QueueMessage, ReceiveOptions};

// =============================================================================
// Fake queue
// =============================================================================

/// One scripted result of a `receive` call.
pub enum Receive {
    Batch(Vec<QueueMessage>),
    Fail,
}

/// Queue that replays scripted receive results, then blocks forever.
#[derive(Default)]
pub struct FakeQueue {
    script: Mutex<VecDeque<Receive>>,
    pub receive_calls: AtomicUsize,
    pub deleted: Mutex<Vec<String>>,
    pub fail_deletes: bool,
}

impl FakeQueue {
    pub fn new(script: Vec<Receive>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn receive_count(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageQueue for FakeQueue {
    async fn resolve_url(&self, name: &str) -> Result<String, QueueError> {
        Ok(format!("https://sqs.local/000000000000/{name}"))
    }

    async fn receive(
        &self,
        _queue_url: &str,
        options: ReceiveOptions,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        assert_eq!(options.max_messages, 2);
        self.receive_calls.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Receive::Batch(messages)) => Ok(messages),
            Some(Receive::Fail) => Err(QueueError::Receive("connection refused".to_string())),
            None => std::future::pending().await,
        }
    }

    async fn delete(&self, _queue_url: &str, receipt_handle: &str) -> Result<(), QueueError> {
        if self.fail_deletes {
            return Err(QueueError::Delete("access denied".to_string()));
        }
        self.deleted
            .lock()
            .unwrap()
            .push(receipt_handle.to_string());
        Ok(())
    }
}

pub fn message(receipt_handle: &str, body: &str) -> QueueMessage {
    QueueMessage {
        message_id: Some(format!("id-{receipt_handle}")),
        receipt_handle: receipt_handle.to_string(),
        body: body.as_bytes().to_vec(),
    }
}

// =============================================================================
// Fake cluster
// =============================================================================

pub fn deployment(namespace: &str, name: &str, containers: &[(&str, &str)]) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            template: PodTemplateSpec {
                metadata: None,
                spec: Some(PodSpec {
                    containers: containers
                        .iter()
                        .map(|(name, image)| Container {
                            name: (*name).to_string(),
                            image: Some((*image).to_string()),
                            ..Default::default()
                        })
                        .collect(),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Deployments held in memory; patches merge containers by name.
#[derive(Default)]
pub struct FakeCluster {
    deployments: Mutex<HashMap<(String, String), Deployment>>,
    pub calls: AtomicUsize,
    pub writes: AtomicUsize,
    pub unavailable: bool,
    pub reject_writes: bool,
    pub reject_reads: bool,
}

impl FakeCluster {
    pub fn with(deployments: Vec<Deployment>) -> Self {
        let cluster = Self::default();
        {
            let mut map = cluster.deployments.lock().unwrap();
            for d in deployments {
                let key = (
                    d.metadata.namespace.clone().unwrap_or_default(),
                    d.metadata.name.clone().unwrap_or_default(),
                );
                map.insert(key, d);
            }
        }
        cluster
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn rejecting_writes(mut self) -> Self {
        self.reject_writes = true;
        self
    }

    pub fn rejecting_reads(mut self) -> Self {
        self.reject_reads = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn containers(&self, namespace: &str, name: &str) -> Vec<(String, Option<String>)> {
        let map = self.deployments.lock().unwrap();
        map.get(&(namespace.to_string(), name.to_string()))
            .and_then(|d| d.spec.as_ref())
            .and_then(|s| s.template.spec.as_ref())
            .map(|p| {
                p.containers
                    .iter()
                    .map(|c| (c.name.clone(), c.image.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn image(&self, namespace: &str, name: &str, container: &str) -> Option<String> {
        self.containers(namespace, name)
            .into_iter()
            .find(|(n, _)| n == container)
            .and_then(|(_, image)| image)
    }

    fn enter(&self) -> Result<(), ClusterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(ClusterError::Connect("invalid kubeconfig".to_string()));
        }
        Ok(())
    }

    fn check_write(&self, name: &str) -> Result<(), ClusterError> {
        if self.reject_writes {
            return Err(ClusterError::Rejected {
                name: name.to_string(),
                reason: "admission webhook denied the request".to_string(),
            });
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn not_found(namespace: &str, name: &str) -> ClusterError {
    ClusterError::NotFound {
        kind: "Deployment",
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

#[async_trait]
impl DeploymentApi for FakeCluster {
    async fn get(&self, namespace: &str, name: &str) -> Result<Deployment, ClusterError> {
        self.enter()?;
        if self.reject_reads {
            return Err(ClusterError::Rejected {
                name: name.to_string(),
                reason: "etcdserver: request timed out".to_string(),
            });
        }
        self.deployments
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| not_found(namespace, name))
    }

    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, ClusterError> {
        self.enter()?;
        self.check_write(name)?;
        let mut map = self.deployments.lock().unwrap();
        let slot = map
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| not_found(namespace, name))?;
        *slot = deployment.clone();
        Ok(slot.clone())
    }

    async fn patch(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<Deployment, ClusterError> {
        self.enter()?;
        self.check_write(name)?;
        let mut map = self.deployments.lock().unwrap();
        let slot = map
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| not_found(namespace, name))?;

        let pod = slot
            .spec
            .get_or_insert_with(Default::default)
            .template
            .spec
            .get_or_insert_with(Default::default);

        let entries = patch["spec"]["template"]["spec"]["containers"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        for entry in entries {
            let patch_name = entry["name"].as_str().unwrap_or_default().to_string();
            let patch_image = entry["image"].as_str().map(str::to_string);
            match pod.containers.iter_mut().find(|c| c.name == patch_name) {
                Some(container) => container.image = patch_image,
                None => pod.containers.push(Container {
                    name: patch_name,
                    image: patch_image,
                    ..Default::default()
                }),
            }
        }

        Ok(slot.clone())
    }
}

// =============================================================================
// Fake Helm
// =============================================================================

/// How `FakeReleases` answers an upgrade.
#[derive(Default, Clone, Copy)]
pub enum ReleaseOutcome {
    #[default]
    Upgraded,
    Failed,
    Missing,
    Unreachable,
}

#[derive(Default)]
pub struct FakeReleases {
    pub upgrades: Mutex<Vec<ReleaseUpgrade>>,
    pub outcome: ReleaseOutcome,
}

impl FakeReleases {
    pub fn answering(outcome: ReleaseOutcome) -> Self {
        Self {
            outcome,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self::answering(ReleaseOutcome::Failed)
    }

    pub fn upgrades(&self) -> Vec<ReleaseUpgrade> {
        self.upgrades.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReleaseManager for FakeReleases {
    async fn upgrade(&self, upgrade: &ReleaseUpgrade) -> Result<(), ClusterError> {
        self.upgrades.lock().unwrap().push(upgrade.clone());
        match self.outcome {
            ReleaseOutcome::Upgraded => Ok(()),
            ReleaseOutcome::Failed => Err(ClusterError::Rejected {
                name: upgrade.release.clone(),
                reason: "helm failed: chart not found".to_string(),
            }),
            ReleaseOutcome::Missing => Err(ClusterError::NotFound {
                kind: "Helm release",
                namespace: upgrade.namespace.clone(),
                name: upgrade.release.clone(),
            }),
            ReleaseOutcome::Unreachable => {
                Err(ClusterError::Connect("cluster unreachable".to_string()))
            }
        }
    }
}
