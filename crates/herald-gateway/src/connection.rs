use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use herald_types::events::Event;
use herald_types::models::UserId;

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// The connection is dropped on the tick after the second missed Pong,
/// about 45s after the last Pong arrived.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Consecutive heartbeats without a Pong before the connection is dropped.
const MAX_MISSED_HEARTBEATS: u8 = 2;

/// Why the outbound half of a stream connection stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendLoopExit {
    /// The dispatcher dropped this listener.
    ListenerClosed,
    /// The client stopped answering pings.
    HeartbeatTimeout,
    /// Writing to the client failed.
    SinkClosed,
}

/// Serve one authenticated stream connection until either side goes away.
///
/// The stream is push-only: every event the dispatcher routes to `user_id`
/// is written as a JSON text frame. Anything the client sends other than
/// Pong or Close is ignored.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, user_id: UserId) {
    let (sender, receiver) = socket.split();
    serve(sender, receiver, dispatcher, user_id).await;
}

/// Transport-independent body of [`handle_connection`].
pub async fn serve<S, R, E>(sender: S, receiver: R, dispatcher: Dispatcher, user_id: UserId)
where
    S: Sink<Message> + Unpin + Send + 'static,
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Send + 'static,
{
    let (conn_id, user_rx) = dispatcher.register(user_id).await;

    info!(%user_id, %conn_id, "Stream connected");

    let pong_received = Arc::new(AtomicBool::new(true));

    let mut send_task = tokio::spawn(forward_events(
        sender,
        user_rx,
        pong_received.clone(),
        HEARTBEAT_INTERVAL,
    ));
    let mut recv_task = tokio::spawn(drain_client(receiver, pong_received));

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.unregister(user_id, conn_id).await;
    info!(%user_id, %conn_id, "Stream disconnected");
}

/// Forward events -> client, with heartbeat.
pub async fn forward_events<S>(
    mut sender: S,
    mut user_rx: mpsc::UnboundedReceiver<Event>,
    pong_received: Arc<AtomicBool>,
    heartbeat_every: Duration,
) -> SendLoopExit
where
    S: Sink<Message> + Unpin,
{
    let mut heartbeat = tokio::time::interval(heartbeat_every);
    heartbeat.tick().await;
    let mut missed_heartbeats: u8 = 0;

    loop {
        tokio::select! {
            event = user_rx.recv() => {
                let Some(event) = event else { return SendLoopExit::ListenerClosed };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode {} event: {}", event.kind(), e);
                        continue;
                    }
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    return SendLoopExit::SinkClosed;
                }
            }
            _ = heartbeat.tick() => {
                if pong_received.swap(false, Ordering::Acquire) {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= MAX_MISSED_HEARTBEATS {
                        warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                        return SendLoopExit::HeartbeatTimeout;
                    }
                }
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    return SendLoopExit::SinkClosed;
                }
            }
        }
    }
}

/// Drain client frames; only Pong and Close matter.
async fn drain_client<R, E>(mut receiver: R, pong_received: Arc<AtomicBool>)
where
    R: Stream<Item = Result<Message, E>> + Unpin,
{
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Pong(_) => pong_received.store(true, Ordering::Release),
            Message::Close(_) => break,
            _ => {}
        }
    }
}
