use super::types::Node;
use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot};

type Thunk = Box<dyn FnOnce(&mut Node) + Send>;

/// Handle to the one task that owns the node state.
///
/// Concurrent RPC handlers, maintenance ticks and operator commands all
/// funnel through the same queue and execute strictly in arrival order, so
/// multi-field updates are never observed half-done.
#[derive(Clone)]
pub struct NodeActor {
    queue: mpsc::UnboundedSender<Thunk>,
}

impl NodeActor {
    /// Move `node` into a freshly spawned owner task and return the handle.
    pub fn spawn(mut node: Node) -> Self {
        let (queue, mut jobs) = mpsc::unbounded_channel::<Thunk>();
        tokio::spawn(async move {
            while let Some(job) = jobs.recv().await {
                job(&mut node);
            }
        });
        NodeActor { queue }
    }

    /// Run `f` against the node state and hand back its result once it has
    /// executed. The closure must stay short and must never perform an
    /// outbound call: the target address may resolve back to this very
    /// node. Routing loops belong on the caller's side of this queue.
    pub async fn with<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Node) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (done, result) = oneshot::channel();
        self.queue
            .send(Box::new(move |node| {
                let _ = done.send(f(node));
            }))
            .map_err(|_| anyhow!("node actor is gone"))?;
        result
            .await
            .map_err(|_| anyhow!("node actor dropped the request"))
    }
}
