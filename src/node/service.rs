use super::actor::NodeActor;
use super::types::{Address, Key, Node};
use crate::error::DhtError;
use crate::ring::id::Id;
use crate::routing::lookup;
use crate::routing::maintenance::{self, MaintenanceConfig};
use crate::rpc::client::RpcClient;
use crate::rpc::handlers;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Ceiling on a full ring walk (`dump_all`). Purely a guard against walking
/// a ring whose successor pointers are still healing into a loop.
const MAX_RING_WALK: usize = 128;

/// What a graceful departure did with the local keys.
#[derive(Debug)]
pub enum LeaveOutcome {
    /// Keys were pushed to the immediate successor.
    Offloaded { to: Address, keys: usize },
    /// We are the only member left; quitting drops whatever we hold. The
    /// caller decides whether that is acceptable.
    LastNode { keys: usize },
}

/// Handle to the one ring member this process runs.
///
/// Cheap to clone; all clones share the same actor, HTTP client and
/// background tasks. State lives behind the actor, never here.
#[derive(Clone)]
pub struct RingNode {
    pub address: Address,
    pub id: Id,
    pub(crate) actor: NodeActor,
    pub(crate) client: RpcClient,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl RingNode {
    /// Establish a fresh ring with this node as its only member.
    pub async fn create(address: Address) -> Result<Self> {
        let node = Self::create_with(address, MaintenanceConfig::from_env()).await?;
        tracing::info!("created ring at {}", node.address.0);
        Ok(node)
    }

    pub(crate) async fn create_with(address: Address, config: MaintenanceConfig) -> Result<Self> {
        let client = RpcClient::new()?;
        Self::start_with(address, None, client, config).await
    }

    /// Join the ring known to `bootstrap`: locate our successor through it,
    /// start serving, then pull over the keys we now own.
    pub async fn join(address: Address, bootstrap: Address) -> Result<Self> {
        let node = Self::join_with(address, bootstrap, MaintenanceConfig::from_env()).await?;
        tracing::info!("joined ring as {}", node.address.0);
        Ok(node)
    }

    pub(crate) async fn join_with(
        address: Address,
        bootstrap: Address,
        config: MaintenanceConfig,
    ) -> Result<Self> {
        let client = RpcClient::new()?;
        let successor = lookup::find(&client, &address.id(), bootstrap)
            .await
            .context("locating successor via bootstrap node")?;
        let node = Self::start_with(address, Some(successor.clone()), client, config).await?;

        let entries = node
            .client
            .get_all(&successor, &node.address)
            .await
            .context("pulling owed keys from successor")?;
        if !entries.is_empty() {
            tracing::info!("received {} keys from {}", entries.len(), successor.0);
            node.actor.with(move |n| n.data.extend(entries)).await?;
        }
        Ok(node)
    }

    async fn start_with(
        address: Address,
        successor: Option<Address>,
        client: RpcClient,
        config: MaintenanceConfig,
    ) -> Result<Self> {
        let port = address
            .port()
            .ok_or_else(|| DhtError::InvalidAddress(address.0.clone()))?;

        let mut state = Node::new(address.clone());
        if let Some(successor) = successor {
            state.successors = vec![successor];
        }
        let id = state.id;
        let actor = NodeActor::spawn(state);

        let node = RingNode {
            address,
            id,
            actor,
            client,
            tasks: Arc::new(Mutex::new(Vec::new())),
        };

        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("binding RPC listener on port {port}"))?;
        let app = handlers::router(node.clone());
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("rpc server: {}", e);
            }
        });

        let mut tasks = maintenance::start(node.clone(), config);
        tasks.push(server);
        node.tasks.lock().await.extend(tasks);

        Ok(node)
    }

    /// Stop serving: abort the RPC server and the maintenance loops.
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            task.abort();
        }
    }

    /// Locate the node responsible for `id`, starting from ourselves.
    pub async fn locate(&self, id: &Id) -> Result<Address> {
        lookup::find(&self.client, id, self.address.clone()).await
    }

    /// Store a key/value pair on whichever node owns the key.
    pub async fn put(&self, key: Key, value: String) -> Result<()> {
        let owner = self.locate(&key.id()).await?;
        self.client.put(&owner, key, value).await
    }

    /// Fetch a key from whichever node owns it.
    pub async fn get(&self, key: Key) -> Result<String> {
        let owner = self.locate(&key.id()).await?;
        self.client.get(&owner, key).await
    }

    /// Delete a key from whichever node owns it, returning the old value.
    pub async fn delete(&self, key: Key) -> Result<String> {
        let owner = self.locate(&key.id()).await?;
        self.client.delete(&owner, key).await
    }

    /// Debug snapshot of the local node.
    pub async fn dump_self(&self) -> Result<String> {
        self.actor.with(|n| n.dump()).await
    }

    /// Debug snapshot of the node responsible for `key`.
    pub async fn dump_key(&self, key: &Key) -> Result<String> {
        let owner = self.locate(&key.id()).await?;
        Ok(self.client.dump(&owner).await?.dump)
    }

    /// Walk the ring successor by successor, collecting every node's
    /// snapshot, starting with our own.
    pub async fn dump_all(&self) -> Result<Vec<String>> {
        let mut dumps = vec![self.dump_self().await?];
        let mut cursor = self.actor.with(|n| n.successor().clone()).await?;
        for _ in 0..MAX_RING_WALK {
            if cursor == self.address {
                return Ok(dumps);
            }
            let reply = self.client.dump(&cursor).await?;
            dumps.push(reply.dump);
            cursor = reply.successor;
        }
        tracing::warn!("ring walk did not return home within {} nodes", MAX_RING_WALK);
        Ok(dumps)
    }

    /// Graceful departure. Hands every local key to the immediate successor
    /// and stops serving. A failed handoff leaves the node running so the
    /// operator can retry; the last node on the ring is reported instead of
    /// shut down, because its keys have nowhere to go.
    pub async fn leave(&self) -> Result<LeaveOutcome> {
        let (successor, entries) = self
            .actor
            .with(|n| (n.successor().clone(), n.data.clone()))
            .await?;

        if successor == self.address {
            return Ok(LeaveOutcome::LastNode {
                keys: entries.len(),
            });
        }

        let keys = entries.len();
        self.client
            .put_all(&successor, entries)
            .await
            .context("offloading data to successor")?;
        self.actor.with(|n| n.data.clear()).await?;
        self.shutdown().await;
        tracing::info!("offloaded {} keys to {}", keys, successor.0);
        Ok(LeaveOutcome::Offloaded { to: successor, keys })
    }
}
