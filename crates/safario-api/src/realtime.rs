//! Owner-scoped change notifications over WebSocket.
//!
//! Handlers that move a record through its workflow publish a
//! [`ChangeEvent`] on the [`ChangeFeed`]; every open `/realtime` socket
//! forwards the events whose record belongs to its user as text frames:
//!
//! ```json
//! {"event":"fir_updated","record":{...},"message":"Your FIR ... is now under investigation."}
//! ```
//!
//! Browsers cannot set headers on a WebSocket handshake, so the token may
//! also be passed as `?access_token=`.

use axum::{
  extract::{
    Query, State,
    ws::{Message, WebSocket, WebSocketUpgrade},
  },
  http::{HeaderMap, header},
  response::Response,
};
use safario_core::{change::ChangeEvent, store::SafetyStore};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{AppState, auth::authenticate, error::ApiError};

const FEED_CAPACITY: usize = 256;

// ─── Feed ────────────────────────────────────────────────────────────────────

/// Fan-out of record changes to connected owners.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
  tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
  fn default() -> Self {
    let (tx, _) = broadcast::channel(FEED_CAPACITY);
    Self { tx }
  }
}

impl ChangeFeed {
  /// Publish `event`. Dropped silently when nobody is listening.
  pub fn publish(&self, event: ChangeEvent) {
    let _ = self.tx.send(event);
  }

  pub fn subscribe(&self, owner: Uuid) -> Subscription {
    Subscription { owner, rx: self.tx.subscribe() }
  }
}

/// One user's view of the feed.
pub struct Subscription {
  owner: Uuid,
  rx:    broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
  /// Next event for this owner; `None` once the feed is gone.
  pub async fn next(&mut self) -> Option<ChangeEvent> {
    loop {
      match self.rx.recv().await {
        Ok(event) if event.owner() == self.owner => return Some(event),
        Ok(_) => continue,
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
          tracing::warn!(owner = %self.owner, skipped, "realtime subscriber lagged");
        }
        Err(broadcast::error::RecvError::Closed) => return None,
      }
    }
  }
}

#[derive(Serialize)]
struct Frame<'a> {
  #[serde(flatten)]
  change:  &'a ChangeEvent,
  message: Option<String>,
}

fn frame(event: &ChangeEvent) -> Result<String, serde_json::Error> {
  serde_json::to_string(&Frame { change: event, message: event.message() })
}

// ─── Handler ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubscribeParams {
  pub access_token: Option<String>,
}

/// `GET /realtime` (WebSocket upgrade)
pub async fn subscribe<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<SubscribeParams>,
  headers: HeaderMap,
  ws: WebSocketUpgrade,
) -> Result<Response, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  let token = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::to_owned)
    .or(params.access_token)
    .ok_or_else(ApiError::unauthorized)?;
  let user = authenticate(&state, token.trim()).await?;

  let subscription = state.feed.subscribe(user.id());
  Ok(ws.on_upgrade(move |socket| forward(socket, subscription)))
}

async fn forward(mut socket: WebSocket, mut subscription: Subscription) {
  let owner = subscription.owner;
  tracing::debug!(%owner, "realtime connected");

  loop {
    tokio::select! {
      event = subscription.next() => {
        let Some(event) = event else { break };
        let text = match frame(&event) {
          Ok(text) => text,
          Err(e) => {
            tracing::error!(error = %e, "cannot encode change event");
            continue;
          }
        };
        if socket.send(Message::Text(text.into())).await.is_err() {
          break;
        }
      }
      incoming = socket.recv() => match incoming {
        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
        Some(Ok(_)) => {}
      },
    }
  }

  tracing::debug!(%owner, "realtime disconnected");
}
