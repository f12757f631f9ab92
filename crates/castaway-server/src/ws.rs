//! The `/join` `WebSocket` transport.
//!
//! Each accepted socket becomes one participant. The handler:
//!
//! 1. Finds or creates the named session.
//! 2. Queues a join carrying the new participant and waits for admission,
//!    so nothing the client sends can reach the session before its join.
//! 3. Pumps frames both ways: outbox messages are encoded as JSON text
//!    frames, and text frames from the client are decoded and queued.
//! 4. Queues a leave once the socket closes or fails.
//!
//! Frames that fail to decode are logged and dropped; the connection
//! stays open.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use castaway_core::participant::Participant;
use castaway_core::registry::{SessionHandle, SessionRegistry};
use castaway_core::runner::{Connection, SessionEvent};
use castaway_types::{
    ClientMessage, ParticipantId, ServerMessage, decode_client_message, encode_server_message,
};
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Display name used when a client sends none.
const ANONYMOUS: &str = "Anonymous";

/// Query parameters accepted by `GET /join`.
#[derive(Debug, Default, Deserialize)]
pub struct JoinParams {
    /// Display name.
    pub name: Option<String>,
    /// Session to join.
    pub game: Option<String>,
}

impl JoinParams {
    /// The display name, falling back to `Anonymous` when absent or blank.
    pub fn display_name(&self) -> String {
        non_blank(self.name.as_deref()).unwrap_or(ANONYMOUS).to_owned()
    }

    /// The session name, falling back to `default_session` when absent or
    /// blank.
    pub fn session_name(&self, default_session: &str) -> String {
        non_blank(self.game.as_deref())
            .unwrap_or(default_session)
            .to_owned()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Upgrade to a `WebSocket` and attach the connection to a session.
///
/// # Route
///
/// `GET /join?name=<display name>&game=<session name>`
pub async fn join(
    ws: WebSocketUpgrade,
    Query(params): Query<JoinParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let name = params.display_name();
    let game = params.session_name(&state.default_session);
    ws.on_upgrade(move |socket| handle_ws(socket, state, game, name))
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>, game: String, name: String) {
    let (participant, outbox) = Participant::connect(name);
    let id = participant.id();

    let Some(session) = attach(&state.registry, &game, participant).await else {
        warn!(session = game, participant = %id, "join rejected");
        return;
    };
    info!(session = game, participant = %id, "websocket attached");

    pump(socket, &session, id, outbox).await;

    detach(&session, id).await;
    info!(session = game, participant = %id, "websocket detached");
}

/// Queue a join for `participant` and wait until the session admits it.
///
/// A session that stopped between lookup and join is replaced once.
async fn attach(
    registry: &SessionRegistry,
    game: &str,
    participant: Participant,
) -> Option<SessionHandle> {
    for _ in 0..2 {
        let session = registry.find_or_create(game).await;
        let (connection, admitted) = Connection::new(participant.clone());
        match session.send(SessionEvent::Join(connection)).await {
            Ok(()) => return admitted.await.is_ok().then_some(session),
            Err(e) => debug!(participant = %participant.id(), error = %e, "join not delivered"),
        }
    }
    None
}

/// Queue the leave for a connection that has gone away.
async fn detach(session: &SessionHandle, id: ParticipantId) {
    if let Err(e) = session.send(SessionEvent::Leave(id)).await {
        debug!(participant = %id, error = %e, "leave not delivered");
    }
}

/// What to do with one frame read from the socket.
#[derive(Debug, PartialEq)]
enum FrameAction {
    /// Queue a decoded message for the session.
    Forward(ClientMessage),
    /// Answer on the socket.
    Reply(Message),
    /// Drop the frame and keep reading.
    Ignore,
    /// The connection is gone.
    Disconnect,
}

fn classify(frame: Option<Result<Message, axum::Error>>, id: ParticipantId) -> FrameAction {
    match frame {
        Some(Ok(Message::Text(text))) => match decode_client_message(text.as_str()) {
            Ok(message) => FrameAction::Forward(message),
            Err(e) => {
                warn!(participant = %id, error = %e, "dropping undecodable frame");
                FrameAction::Ignore
            }
        },
        Some(Ok(Message::Binary(data))) => {
            debug!(participant = %id, len = data.len(), "ignoring binary frame");
            FrameAction::Ignore
        }
        Some(Ok(Message::Ping(data))) => FrameAction::Reply(Message::Pong(data)),
        Some(Ok(Message::Pong(_))) => FrameAction::Ignore,
        Some(Ok(Message::Close(_))) | None => {
            debug!(participant = %id, "websocket closed by client");
            FrameAction::Disconnect
        }
        Some(Err(e)) => {
            debug!(participant = %id, error = %e, "websocket error");
            FrameAction::Disconnect
        }
    }
}

/// Shuttle frames until either side goes away.
async fn pump(
    mut socket: WebSocket,
    session: &SessionHandle,
    id: ParticipantId,
    mut outbox: UnboundedReceiver<ServerMessage>,
) {
    loop {
        tokio::select! {
            outgoing = outbox.recv() => {
                let Some(message) = outgoing else {
                    debug!(participant = %id, "outbox closed");
                    return;
                };
                let json = match encode_server_message(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(participant = %id, error = %e, "failed to encode server message");
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    debug!(participant = %id, "websocket send failed");
                    return;
                }
            }
            incoming = socket.recv() => match classify(incoming, id) {
                FrameAction::Forward(message) => {
                    if session.send(SessionEvent::Message { from: id, message }).await.is_err() {
                        debug!(participant = %id, "session closed");
                        return;
                    }
                }
                FrameAction::Reply(reply) => {
                    if socket.send(reply).await.is_err() {
                        debug!(participant = %id, "websocket reply failed");
                        return;
                    }
                }
                FrameAction::Ignore => {}
                FrameAction::Disconnect => return,
            },
        }
    }
}
