//! Relay server: assigns peer ids, hands out the session seed and forwards
//! score and aim-pose messages between peers. It never simulates anything.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use beamsweep_shared::protocol::{
    PeerMsg, PeerWire, PeersStateMsg, RelayMsg, RemoteAimPoseMsg, RemoteScoreMsg, WelcomeMsg,
    PROTOCOL_VERSION,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio::sync::{broadcast, mpsc, oneshot};
use tower_http::cors::CorsLayer;

use crate::config::RelayConfig;
use crate::error::RelayError;

/// Longest display name kept from the join query
const MAX_NAME_LEN: usize = 32;

/// Commands from connections to the roster task
pub enum RelayCommand {
    Join {
        name: Option<String>,
        response: oneshot::Sender<(u32, WelcomeMsg)>,
    },
    Leave {
        id: u32,
    },
}

/// Fan-out from the relay to every connection
#[derive(Debug, Clone)]
pub enum RelayBroadcast {
    PeersState(PeersStateMsg),
    /// A peer message, not echoed back to its sender
    Forward { from: u32, msg: RelayMsg },
}

/// Generate a color from peer ID using golden angle hue distribution.
pub fn color_from_id(id: u32) -> u32 {
    let hue = id.wrapping_mul(137) % 360;
    hsv_to_rgb(hue as f64, 0.6, 0.9)
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> u32 {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h as u32 / 60 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let to_byte = |v: f64| ((v + m) * 255.0).round() as u32;
    (to_byte(r) << 16) | (to_byte(g) << 8) | to_byte(b)
}

fn display_name(requested: Option<String>, id: u32) -> String {
    match requested {
        Some(name) if !name.trim().is_empty() => name.trim().chars().take(MAX_NAME_LEN).collect(),
        _ => format!("peer-{}", id),
    }
}

/// Connected peers, keyed by id
#[derive(Debug, Default)]
struct Roster {
    next_id: u32,
    peers: BTreeMap<u32, PeerWire>,
}

impl Roster {
    fn join(&mut self, name: Option<String>, max_peers: usize) -> Option<u32> {
        if self.peers.len() >= max_peers {
            return None;
        }
        self.next_id += 1;
        let id = self.next_id;
        self.peers.insert(
            id,
            PeerWire {
                id,
                name: display_name(name, id),
                color: color_from_id(id),
            },
        );
        Some(id)
    }

    fn leave(&mut self, id: u32) -> bool {
        self.peers.remove(&id).is_some()
    }

    fn state(&self) -> PeersStateMsg {
        PeersStateMsg {
            peers: self.peers.values().cloned().collect(),
        }
    }
}

/// Owns the roster. Joins beyond `max_peers` get their response dropped.
pub async fn run_roster(
    mut cmd_rx: mpsc::Receiver<RelayCommand>,
    broadcast_tx: broadcast::Sender<RelayBroadcast>,
    config: RelayConfig,
) {
    let mut roster = Roster::default();

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            RelayCommand::Join { name, response } => {
                let Some(id) = roster.join(name, config.max_peers) else {
                    tracing::warn!("Relay full ({} peers), rejecting join", config.max_peers);
                    continue;
                };
                let welcome = WelcomeMsg {
                    protocol_version: PROTOCOL_VERSION,
                    server_version: env!("CARGO_PKG_VERSION").to_string(),
                    self_id: id,
                    peers: roster.state().peers,
                    rng_seed: config.rng_seed,
                };
                if response.send((id, welcome)).is_err() {
                    roster.leave(id);
                    continue;
                }
                let _ = broadcast_tx.send(RelayBroadcast::PeersState(roster.state()));
            }
            RelayCommand::Leave { id } => {
                if roster.leave(id) {
                    let _ = broadcast_tx.send(RelayBroadcast::PeersState(roster.state()));
                    tracing::info!("Peer {} left", id);
                }
            }
        }
    }
}

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub relay_tx: mpsc::Sender<RelayCommand>,
    pub broadcast_tx: broadcast::Sender<RelayBroadcast>,
}

#[derive(Debug, Deserialize)]
pub struct JoinParams {
    #[serde(default)]
    pub name: Option<String>,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<JoinParams>,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, params.name, app_state))
}

fn forward_of(from: u32, msg: PeerMsg) -> RelayMsg {
    match msg {
        PeerMsg::Score { target_id } => RelayMsg::Score(RemoteScoreMsg { from, target_id }),
        PeerMsg::AimPose { pose } => RelayMsg::AimPose(RemoteAimPoseMsg { from, pose }),
    }
}

async fn handle_socket(socket: WebSocket, name: Option<String>, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();

    // Subscribe before joining so our own PeersState update is not missed
    let mut broadcast_rx = app_state.broadcast_tx.subscribe();

    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .relay_tx
        .send(RelayCommand::Join {
            name,
            response: resp_tx,
        })
        .await
        .is_err()
    {
        tracing::error!("Failed to send Join command");
        return;
    }

    let (my_id, welcome) = match resp_rx.await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("Join rejected");
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };

    tracing::info!("Peer {} connected", my_id);

    let welcome_json = match serde_json::to_string(&RelayMsg::Welcome(welcome)) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to encode welcome: {}", e);
            return;
        }
    };
    if sink.send(Message::Text(welcome_json.into())).await.is_ok() {
        loop {
            tokio::select! {
                // Peer -> Relay
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<PeerMsg>(&text) {
                                Ok(peer_msg) => {
                                    let _ = app_state.broadcast_tx.send(RelayBroadcast::Forward {
                                        from: my_id,
                                        msg: forward_of(my_id, peer_msg),
                                    });
                                }
                                Err(e) => tracing::debug!("Peer {} sent bad message: {}", my_id, e),
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            tracing::debug!("Peer {} socket error: {}", my_id, e);
                            break;
                        }
                        _ => {} // Ignore ping/pong/binary
                    }
                }

                // Relay -> Peer
                result = broadcast_rx.recv() => {
                    match result {
                        Ok(broadcast) => {
                            let json = match broadcast {
                                RelayBroadcast::PeersState(msg) => {
                                    serde_json::to_string(&RelayMsg::PeersState(msg))
                                }
                                RelayBroadcast::Forward { from, msg } => {
                                    if from == my_id {
                                        continue;
                                    }
                                    serde_json::to_string(&msg)
                                }
                            };

                            if let Ok(json) = json {
                                if sink.send(Message::Text(json.into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // Dropped scores are lost for this peer; poses are superseded anyway
                            tracing::warn!("Peer {} lagged by {} messages", my_id, n);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    }

    let _ = app_state
        .relay_tx
        .send(RelayCommand::Leave { id: my_id })
        .await;
    tracing::info!("Peer {} disconnected", my_id);
}

/// Build the relay router and spawn its roster task.
pub fn app(config: &RelayConfig) -> Router {
    let (relay_tx, relay_rx) = mpsc::channel::<RelayCommand>(256);
    let (broadcast_tx, _) = broadcast::channel::<RelayBroadcast>(config.broadcast_capacity);

    tokio::spawn(run_roster(relay_rx, broadcast_tx.clone(), config.clone()));

    Router::new()
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(AppState {
            relay_tx,
            broadcast_tx,
        })
}

/// Bind `listen_addr` and serve until the listener fails.
pub async fn serve(config: RelayConfig) -> Result<(), RelayError> {
    config.validate().map_err(RelayError::InvalidConfig)?;
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(RelayError::Bind)?;
    tracing::info!(
        "Relay listening on {} (seed {})",
        config.listen_addr,
        config.rng_seed
    );
    axum::serve(listener, app(&config))
        .await
        .map_err(RelayError::Serve)
}
