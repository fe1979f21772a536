//! Subscriber-facing HTTP surface on a single port.
//!
//! - `GET /<ws_path>` upgrades to a WebSocket that streams envelope frames (server → client
//!   only; anything the client sends is read and discarded).
//! - Every other path is served from the static asset directory.

#[cfg(test)]
mod transport_test;

use std::net::SocketAddr;
use std::path::PathBuf;

use futures::SinkExt;
use futures::StreamExt;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use warp::ws::Message;
use warp::ws::WebSocket;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

use crate::broadcast::BroadcastHandle;
use crate::config::ServerConfig;
use crate::Error;
use crate::Result;

/// WebSocket route for `ws_path`, falling back to static files under `static_dir`.
pub fn routes(
    ws_path: String,
    static_dir: PathBuf,
    broadcast: BroadcastHandle,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let with_broadcast = warp::any().map(move || broadcast.clone());

    let subscribe = warp::path(ws_path)
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_broadcast)
        .map(|ws: warp::ws::Ws, broadcast: BroadcastHandle| {
            ws.on_upgrade(move |socket| serve_subscriber(socket, broadcast))
        });

    subscribe.or(warp::fs::dir(static_dir))
}

/// Streams frames to one WebSocket until either side goes away.
pub async fn serve_subscriber(
    socket: WebSocket,
    broadcast: BroadcastHandle,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subscription = broadcast.subscribe();
    let id = subscription.id();
    debug!(subscriber = id, "websocket session opened");

    loop {
        tokio::select! {
            frame = subscription.recv() => {
                let Some(frame) = frame else {
                    debug!(subscriber = id, "broadcaster stopped, closing websocket");
                    let _ = ws_tx.close().await;
                    break;
                };
                if let Err(e) = ws_tx.send(Message::text(frame.to_string())).await {
                    debug!(subscriber = id, "websocket send failed: {}", e);
                    break;
                }
            }
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(msg)) if msg.is_close() => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(subscriber = id, "websocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    debug!(subscriber = id, "websocket session closed");
    // dropping the subscription unregisters it
}

/// Binds the listener and serves until `shutdown_signal` fires.
///
/// Returns the bound address (useful with port 0) and the server future.
pub fn bind(
    config: &ServerConfig,
    broadcast: BroadcastHandle,
    mut shutdown_signal: watch::Receiver<()>,
) -> Result<(SocketAddr, impl std::future::Future<Output = ()>)> {
    let addr = config.socket_addr()?;
    let routes = routes(config.ws_path.clone(), config.static_dir.clone(), broadcast);

    let (bound, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, async move {
            let _ = shutdown_signal.changed().await;
        })
        .map_err(|e| Error::Bind(format!("{}: {}", addr, e)))?;

    info!("serving subscribers on {}", bound);
    Ok((bound, server))
}
