//! Live channel.
//!
//! Each WebSocket connection subscribes to the [`Hub`](crate::hub::Hub) and
//! gets every event published from then on, plus one `jobs_updated` right
//! after connecting so it knows to fetch the job list. Clients can ask for
//! another `jobs_updated` with `{"event":"get_jobs"}`; that reply goes to the
//! asking connection only.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use sw_models::live::{LiveClientMessage, LiveEvent};
use tokio::{
    sync::{broadcast::error::RecvError, mpsc::channel},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{prelude::*, state::AppState};

pub async fn live_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

fn encode(event: &LiveEvent) -> Result<Message> {
    Ok(Message::Text(serde_json::to_string(event)?.into()))
}

/// One live subscriber; returns when either side closes.
async fn handle_socket(state: AppState, mut socket: WebSocket) {
    let mut events = state.hub.subscribe();
    info!(
        "Live subscriber connected, {} subscribed",
        state.hub.subscriber_count()
    );

    let greeting = match encode(&LiveEvent::JobsUpdated) {
        Ok(message) => socket.send(message).await.map_err(Error::from),
        Err(err) => Err(err),
    };
    if let Err(err) = greeting {
        warn!("Failed to greet live subscriber: {err}");
        return;
    }

    let (mut sender, mut receiver) = socket.split();
    let (direct_tx, mut direct_rx) = channel::<LiveEvent>(8);

    let mut send_task: JoinHandle<Result<()>> = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Live subscriber lagging, {missed} events dropped");
                        continue;
                    }
                    Err(RecvError::Closed) => return Ok(()),
                },
                Some(event) = direct_rx.recv() => event,
            };
            sender.send(encode(&event)?).await?;
        }
    });

    let mut recv_task: JoinHandle<Result<()>> = tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            match message? {
                Message::Text(text) => match serde_json::from_str::<LiveClientMessage>(&text) {
                    Ok(LiveClientMessage::GetJobs) => {
                        if direct_tx.send(LiveEvent::JobsUpdated).await.is_err() {
                            return Ok(());
                        }
                    }
                    Err(err) => debug!("Ignoring live client message {}: {err}", text.as_str()),
                },
                Message::Close(frame) => {
                    debug!("Live subscriber closed: {:?}", frame);
                    return Ok(());
                }
                Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
            }
        }
        Ok(())
    });

    tokio::select! {
        rv = (&mut send_task) => {
            debug!("Live send task ended: {:?}", rv);
            recv_task.abort();
        },
        rv = (&mut recv_task) => {
            debug!("Live receive task ended: {:?}", rv);
            send_task.abort();
        }
    }
    info!("Live subscriber disconnected");
}
