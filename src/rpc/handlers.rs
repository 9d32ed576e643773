//! RPC Handlers
//!
//! HTTP endpoints that expose a node's operations to the ring. Each handler
//! translates the request into a closure on the node actor and maps the
//! outcome onto a status code; none of them performs outbound calls while
//! the closure runs.

use axum::{
    extract::Extension,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::protocol::{
    AckResponse, AddressResult, DumpResponse, FindSuccessorRequest, GetAllRequest, GetAllResponse,
    GetResponse, KeyRequest, NotifyRequest, PingResponse, PutAllRequest, PutRequest,
    ENDPOINT_DELETE, ENDPOINT_DUMP, ENDPOINT_FIND_SUCCESSOR, ENDPOINT_GET, ENDPOINT_GET_ALL,
    ENDPOINT_NODE_LINKS, ENDPOINT_NOTIFY, ENDPOINT_PING, ENDPOINT_PUT, ENDPOINT_PUT_ALL,
};
use crate::node::service::RingNode;
use crate::node::types::NodeLinks;

/// The full RPC surface of one node.
pub fn router(node: RingNode) -> Router {
    Router::new()
        .route(ENDPOINT_PING, get(handle_ping))
        .route(ENDPOINT_FIND_SUCCESSOR, post(handle_find_successor))
        .route(ENDPOINT_NOTIFY, post(handle_notify))
        .route(ENDPOINT_NODE_LINKS, get(handle_node_links))
        .route(ENDPOINT_PUT, post(handle_put))
        .route(ENDPOINT_GET, post(handle_get))
        .route(ENDPOINT_DELETE, post(handle_delete))
        .route(ENDPOINT_PUT_ALL, post(handle_put_all))
        .route(ENDPOINT_GET_ALL, post(handle_get_all))
        .route(ENDPOINT_DUMP, get(handle_dump))
        .layer(Extension(node))
}

pub async fn handle_ping() -> Json<PingResponse> {
    Json(PingResponse { alive: true })
}

pub async fn handle_find_successor(
    Extension(node): Extension<RingNode>,
    Json(req): Json<FindSuccessorRequest>,
) -> Result<Json<AddressResult>, StatusCode> {
    let step = node
        .actor
        .with(move |n| {
            let (found, address) = n.find_successor_step(&req.id);
            AddressResult { found, address }
        })
        .await
        .map_err(|e| {
            tracing::error!("find_successor: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(step))
}

pub async fn handle_notify(
    Extension(node): Extension<RingNode>,
    Json(req): Json<NotifyRequest>,
) -> (StatusCode, Json<AckResponse>) {
    match node
        .actor
        .with(move |n| n.consider_predecessor(req.candidate))
        .await
    {
        Ok(()) => (StatusCode::OK, Json(AckResponse { success: true })),
        Err(e) => {
            tracing::error!("notify: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AckResponse { success: false }),
            )
        }
    }
}

pub async fn handle_node_links(
    Extension(node): Extension<RingNode>,
) -> Result<Json<NodeLinks>, StatusCode> {
    let links = node
        .actor
        .with(|n| NodeLinks {
            predecessor: n.predecessor.clone(),
            successors: n.successors.clone(),
        })
        .await
        .map_err(|e| {
            tracing::error!("node_links: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(links))
}

pub async fn handle_put(
    Extension(node): Extension<RingNode>,
    Json(req): Json<PutRequest>,
) -> (StatusCode, Json<AckResponse>) {
    match node
        .actor
        .with(move |n| {
            n.data.insert(req.key, req.value);
        })
        .await
    {
        Ok(()) => (StatusCode::OK, Json(AckResponse { success: true })),
        Err(e) => {
            tracing::error!("put: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AckResponse { success: false }),
            )
        }
    }
}

pub async fn handle_get(
    Extension(node): Extension<RingNode>,
    Json(req): Json<KeyRequest>,
) -> (StatusCode, Json<GetResponse>) {
    match node.actor.with(move |n| n.data.get(&req.key).cloned()).await {
        Ok(Some(value)) => (StatusCode::OK, Json(GetResponse { value: Some(value) })),
        Ok(None) => (StatusCode::NOT_FOUND, Json(GetResponse { value: None })),
        Err(e) => {
            tracing::error!("get: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GetResponse { value: None }),
            )
        }
    }
}

/// Removes the key and replies with the value it had.
pub async fn handle_delete(
    Extension(node): Extension<RingNode>,
    Json(req): Json<KeyRequest>,
) -> (StatusCode, Json<GetResponse>) {
    match node.actor.with(move |n| n.data.remove(&req.key)).await {
        Ok(Some(value)) => (StatusCode::OK, Json(GetResponse { value: Some(value) })),
        Ok(None) => (StatusCode::NOT_FOUND, Json(GetResponse { value: None })),
        Err(e) => {
            tracing::error!("delete: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GetResponse { value: None }),
            )
        }
    }
}

pub async fn handle_put_all(
    Extension(node): Extension<RingNode>,
    Json(req): Json<PutAllRequest>,
) -> (StatusCode, Json<AckResponse>) {
    let count = req.entries.len();
    match node
        .actor
        .with(move |n| n.data.extend(req.entries))
        .await
    {
        Ok(()) => {
            tracing::info!("merged {} offloaded keys", count);
            (StatusCode::OK, Json(AckResponse { success: true }))
        }
        Err(e) => {
            tracing::error!("put_all: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AckResponse { success: false }),
            )
        }
    }
}

/// Hands over and deletes every key the joining node now owns.
pub async fn handle_get_all(
    Extension(node): Extension<RingNode>,
    Json(req): Json<GetAllRequest>,
) -> Result<Json<GetAllResponse>, StatusCode> {
    let entries = node
        .actor
        .with(move |n| n.take_keys_for(&req.address))
        .await
        .map_err(|e| {
            tracing::error!("get_all: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    if !entries.is_empty() {
        tracing::info!("transferred {} keys to joining node", entries.len());
    }
    Ok(Json(GetAllResponse { entries }))
}

pub async fn handle_dump(
    Extension(node): Extension<RingNode>,
) -> Result<Json<DumpResponse>, StatusCode> {
    let (dump, successor) = node
        .actor
        .with(|n| (n.dump(), n.successor().clone()))
        .await
        .map_err(|e| {
            tracing::error!("dump: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(DumpResponse { dump, successor }))
}
