//! Peer link: carries the local sync endpoints over a relay connection and
//! feeds relay traffic back into the game loop as commands.

use beamsweep_shared::protocol::{PeerMsg, PoseWire, RelayMsg, PROTOCOL_VERSION};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::game_loop::GameCommand;
use crate::sync::{RemoteEvent, SyncEndpoints};

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_millis(1000);
const MAX_RECONNECT_DELAY: Duration = Duration::from_millis(30_000);

/// Why a connection ended
enum LinkEnd {
    Disconnected,
    /// The game loop is gone or the relay speaks another protocol
    Stop,
}

/// Game commands for one relay message.
pub fn commands_for(msg: RelayMsg) -> Vec<GameCommand> {
    match msg {
        RelayMsg::Welcome(welcome) => vec![
            GameCommand::Reseed(welcome.rng_seed),
            GameCommand::SetRoster(welcome.peers.into_iter().map(|p| p.name).collect()),
        ],
        RelayMsg::PeersState(state) => vec![GameCommand::SetRoster(
            state.peers.into_iter().map(|p| p.name).collect(),
        )],
        other => RemoteEvent::from_relay(&other)
            .map(GameCommand::Remote)
            .into_iter()
            .collect(),
    }
}

/// Connect to `url` and keep reconnecting with backoff until the game loop
/// goes away. Scores queued while disconnected are sent after reconnecting.
pub fn spawn_peer_link(
    url: String,
    mut endpoints: SyncEndpoints,
    game_tx: mpsc::Sender<GameCommand>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reconnect_delay = INITIAL_RECONNECT_DELAY;

        loop {
            let (ws_stream, _) = match tokio_tungstenite::connect_async(url.as_str()).await {
                Ok(x) => x,
                Err(e) => {
                    tracing::debug!("Relay connect failed: {}", e);
                    if game_tx.is_closed() {
                        return;
                    }
                    tokio::time::sleep(reconnect_delay).await;
                    reconnect_delay = reconnect_delay.mul_f32(1.5).min(MAX_RECONNECT_DELAY);
                    continue;
                }
            };

            reconnect_delay = INITIAL_RECONNECT_DELAY;
            tracing::info!("Connected to relay {}", url);

            let (mut write, mut read) = ws_stream.split();
            let end = loop {
                tokio::select! {
                    biased;

                    Some(score) = endpoints.scores.recv() => {
                        let msg = PeerMsg::Score { target_id: score.target_id };
                        if let Ok(text) = serde_json::to_string(&msg) {
                            if write.send(Message::Text(text.into())).await.is_err() {
                                // The score is lost with the connection
                                tracing::warn!("Dropped score for target {} on disconnect", score.target_id);
                                break LinkEnd::Disconnected;
                            }
                        }
                    }

                    Ok(()) = endpoints.poses.changed() => {
                        let latest = *endpoints.poses.borrow_and_update();
                        if let Some(event) = latest {
                            let msg = PeerMsg::AimPose { pose: PoseWire::from_pose(&event.pose) };
                            if let Ok(text) = serde_json::to_string(&msg) {
                                if write.send(Message::Text(text.into())).await.is_err() {
                                    break LinkEnd::Disconnected;
                                }
                            }
                        }
                    }

                    msg = read.next() => {
                        match msg {
                            Some(Ok(Message::Text(txt))) => {
                                let relay_msg = match serde_json::from_str::<RelayMsg>(&txt) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        tracing::debug!("Ignoring relay message: {}", e);
                                        continue;
                                    }
                                };
                                if let RelayMsg::Welcome(welcome) = &relay_msg {
                                    if welcome.protocol_version != PROTOCOL_VERSION {
                                        tracing::error!(
                                            "Protocol mismatch: relay {}, local {}",
                                            welcome.protocol_version,
                                            PROTOCOL_VERSION
                                        );
                                        let _ = write.close().await;
                                        break LinkEnd::Stop;
                                    }
                                    tracing::info!(
                                        "Joined relay as peer {} with seed {}",
                                        welcome.self_id,
                                        welcome.rng_seed
                                    );
                                }
                                let mut closed = false;
                                for cmd in commands_for(relay_msg) {
                                    if game_tx.send(cmd).await.is_err() {
                                        closed = true;
                                        break;
                                    }
                                }
                                if closed {
                                    let _ = write.close().await;
                                    break LinkEnd::Stop;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => break LinkEnd::Disconnected,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                tracing::debug!("Relay socket error: {}", e);
                                break LinkEnd::Disconnected;
                            }
                        }
                    }
                }
            };

            match end {
                LinkEnd::Stop => return,
                LinkEnd::Disconnected => {
                    tracing::warn!("Disconnected from relay, retrying in {:?}", reconnect_delay);
                    tokio::time::sleep(reconnect_delay).await;
                    reconnect_delay = reconnect_delay.mul_f32(1.5).min(MAX_RECONNECT_DELAY);
                }
            }
        }
    })
}
