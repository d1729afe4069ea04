use crate::error::{AppError, AppResult};
use crate::models::ViewName;
use crate::services::assembler::{ViewError, ViewOutcome, ViewState};
use crate::services::price_predictor::{PredictionRequest, PredictionResponse};
use crate::services::{DashboardService, PricePredictorClient};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Messages sent by dashboard clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Request a view. A view already loading or settled is not fetched again.
    #[serde(rename = "load")]
    Load { view: ViewName },
    /// Fetch a view again regardless of its current state
    #[serde(rename = "reload")]
    Reload { view: ViewName },
    #[serde(rename = "predict")]
    Predict {
        #[serde(default)]
        request_id: Option<String>,
        input: PredictionRequest,
    },
}

/// Messages pushed to dashboard clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "connected")]
    Connected { client_id: String, message: String },
    #[serde(rename = "view_state")]
    ViewState {
        view: ViewName,
        state: ViewState,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<ViewError>,
    },
    #[serde(rename = "prediction")]
    Prediction {
        request_id: Option<String>,
        prediction: PredictionResponse,
    },
    #[serde(rename = "error")]
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        message: String,
    },
}

/// View states of one connected client
#[derive(Debug, Default)]
pub struct ClientSession {
    views: HashMap<ViewName, ViewState>,
}

impl ClientSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`ViewState::begin`]
    pub fn begin(&mut self, view: ViewName, reload: bool) -> bool {
        self.views.entry(view).or_default().begin(reload)
    }

    pub fn resolve<T: Serialize>(
        &mut self,
        view: ViewName,
        result: Result<ViewOutcome<T>, ViewError>,
    ) -> bool {
        self.views.entry(view).or_default().resolve(view, result)
    }

    pub fn state(&self, view: ViewName) -> ViewState {
        self.views.get(&view).cloned().unwrap_or_default()
    }
}

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

type WsSink = Arc<Mutex<SplitSink<WebSocketStream<TcpStream>, Message>>>;

async fn send(sink: &WsSink, client_id: Uuid, message: &ServerMessage) {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize message: {}", e);
            return;
        }
    };
    let mut sender = sink.lock().await;
    if let Err(e) = sender.send(Message::Text(json)).await {
        warn!("Failed to send message to client {}: {}", client_id, e);
    }
}

/// WebSocket server pushing view states to dashboard clients
#[derive(Clone)]
pub struct DashboardSocketServer {
    dashboard: Arc<DashboardService>,
    predictor: Option<Arc<PricePredictorClient>>,
}

impl DashboardSocketServer {
    pub fn new(dashboard: Arc<DashboardService>, predictor: Option<Arc<PricePredictorClient>>) -> Self {
        Self {
            dashboard,
            predictor,
        }
    }

    /// Accept connections until the listener fails permanently
    pub async fn serve(self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New WebSocket connection from {}", addr);
                    let server = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream).await {
                            error!("WebSocket connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("WebSocket accept error: {}", e);
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }

    /// Handle a new WebSocket connection
    pub async fn handle_connection(&self, stream: TcpStream) -> AppResult<()> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| AppError::Message(format!("WebSocket handshake failed: {}", e)))?;

        let (ws_sender, mut ws_receiver) = ws_stream.split();
        let sink: WsSink = Arc::new(Mutex::new(ws_sender));
        let session = Arc::new(Mutex::new(ClientSession::new()));
        let client_id = Uuid::new_v4();

        info!("New dashboard client: {}", client_id);
        send(
            &sink,
            client_id,
            &ServerMessage::Connected {
                client_id: client_id.to_string(),
                message: "Connected to Airbnb insights server".to_string(),
            },
        )
        .await;

        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Load { view }) => {
                        self.request_view(&sink, &session, client_id, view, false).await;
                    }
                    Ok(ClientMessage::Reload { view }) => {
                        self.request_view(&sink, &session, client_id, view, true).await;
                    }
                    Ok(ClientMessage::Predict { request_id, input }) => {
                        self.request_prediction(&sink, client_id, request_id, input);
                    }
                    Err(e) => {
                        warn!("Failed to parse message from client {}: {}", client_id, e);
                        send(
                            &sink,
                            client_id,
                            &ServerMessage::Error {
                                request_id: None,
                                message: "Invalid message format".to_string(),
                            },
                        )
                        .await;
                    }
                },
                Ok(Message::Close(_)) => {
                    info!("WebSocket connection closed: {}", client_id);
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Reply with the current state, then run the view if it was started
    async fn request_view(
        &self,
        sink: &WsSink,
        session: &Arc<Mutex<ClientSession>>,
        client_id: Uuid,
        view: ViewName,
        reload: bool,
    ) {
        let (started, state) = {
            let mut session = session.lock().await;
            let started = session.begin(view, reload);
            (started, session.state(view))
        };
        send(
            sink,
            client_id,
            &ServerMessage::ViewState {
                view,
                state,
                warning: None,
            },
        )
        .await;

        if !started {
            return;
        }

        let dashboard = self.dashboard.clone();
        let sink = sink.clone();
        let session = session.clone();
        tokio::spawn(async move {
            let result = dashboard.view(view).await;
            let warning = result.as_ref().ok().and_then(|outcome| outcome.warning(view));
            let state = {
                let mut session = session.lock().await;
                session.resolve(view, result);
                session.state(view)
            };
            send(
                &sink,
                client_id,
                &ServerMessage::ViewState {
                    view,
                    state,
                    warning,
                },
            )
            .await;
        });
    }

    fn request_prediction(
        &self,
        sink: &WsSink,
        client_id: Uuid,
        request_id: Option<String>,
        input: PredictionRequest,
    ) {
        let sink = sink.clone();
        let predictor = self.predictor.clone();
        tokio::spawn(async move {
            let reply = match predictor {
                None => ServerMessage::Error {
                    request_id,
                    message: "Price prediction service is not configured".to_string(),
                },
                Some(predictor) => match predictor.predict(input).await {
                    Ok(prediction) => ServerMessage::Prediction {
                        request_id,
                        prediction,
                    },
                    Err(e) => {
                        warn!("Prediction for client {} failed: {}", client_id, e);
                        ServerMessage::Error {
                            request_id,
                            message: e.to_string(),
                        }
                    }
                },
            };
            send(&sink, client_id, &reply).await;
        });
    }
}
