use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use uuid::Uuid;

use inspect_domain::{
    Credential, InspectResultSink, InspectWorker, RawItem, WorkerConnector, WorkerInitError,
    WorkerSendError,
};

type GatewayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const LOGIN_THROTTLED: &str = "LOGIN_THROTTLED";

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub url: String,
    pub proxy_url: Option<String>,
    pub login_timeout: Duration,
}

/// Opens one gateway session per account.
pub struct GatewayConnector {
    settings: GatewaySettings,
}

impl GatewayConnector {
    pub fn new(settings: GatewaySettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl WorkerConnector for GatewayConnector {
    async fn connect(
        &self,
        credential: &Credential,
        sink: Arc<dyn InspectResultSink>,
    ) -> Result<Arc<dyn InspectWorker>, WorkerInitError> {
        let (socket, _) = tokio_tungstenite::connect_async(self.settings.url.as_str())
            .await
            .map_err(|err| WorkerInitError::Other(format!("gateway connect failed: {}", err)))?;
        let (mut write, mut read) = socket.split();

        let echo = Uuid::new_v4().to_string();
        let login = login_request(credential, self.settings.proxy_url.as_deref(), &echo);
        write
            .send(Message::Text(login))
            .await
            .map_err(|err| WorkerInitError::Other(format!("gateway send failed: {}", err)))?;

        let reply = timeout(
            self.settings.login_timeout,
            await_reply(&mut read, &mut write, &echo),
        )
        .await
        .map_err(|_| WorkerInitError::InitializationTimeout)??;

        if reply.status.as_deref() != Some("ok") {
            let code = reply.error.unwrap_or_else(|| "login failed".to_string());
            let _ = write.close().await;
            return Err(WorkerInitError::from_code(&code));
        }

        info!(username = credential.username.as_str(), "bot logged in through gateway");
        Ok(Arc::new(GatewayWorker::start(
            credential.username.clone(),
            write,
            read,
            sink,
        )))
    }
}

async fn await_reply(
    read: &mut SplitStream<GatewayStream>,
    write: &mut SplitSink<GatewayStream, Message>,
    echo: &str,
) -> Result<GatewayFrame, WorkerInitError> {
    while let Some(next) = read.next().await {
        match next {
            Ok(Message::Text(text)) => {
                if let Some(frame) = parse_frame(&text) {
                    if frame.echo.as_deref() == Some(echo) {
                        return Ok(frame);
                    }
                }
            }
            Ok(Message::Ping(bytes)) => {
                let _ = write.send(Message::Pong(bytes)).await;
            }
            Ok(Message::Close(frame)) => {
                return Err(WorkerInitError::Other(format!("gateway closed: {:?}", frame)));
            }
            Ok(_) => {}
            Err(err) => return Err(WorkerInitError::Other(format!("gateway stream error: {}", err))),
        }
    }
    Err(WorkerInitError::Other("gateway stream ended".to_string()))
}

/// Inspect requests awaiting a result, keyed by echo.
type InFlight = Arc<Mutex<HashMap<String, u64>>>;

/// Worker backed by a gateway session. Inspect requests are queued to a
/// writer task; a reader task forwards results and failures to the sink.
pub struct GatewayWorker {
    username: String,
    outbound: UnboundedSender<Message>,
    in_flight: InFlight,
    connected: Arc<AtomicBool>,
    ready: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl GatewayWorker {
    fn start(
        username: String,
        mut write: SplitSink<GatewayStream, Message>,
        mut read: SplitStream<GatewayStream>,
        sink: Arc<dyn InspectResultSink>,
    ) -> Self {
        let connected = Arc::new(AtomicBool::new(true));
        let ready = Arc::new(AtomicBool::new(true));
        let in_flight: InFlight = Arc::new(Mutex::new(HashMap::new()));
        let (outbound, mut queue) = mpsc::unbounded_channel::<Message>();

        let writer_connected = Arc::clone(&connected);
        let writer_name = username.clone();
        let writer = tokio::spawn(async move {
            while let Some(message) = queue.recv().await {
                if let Err(err) = write.send(message).await {
                    warn!(username = writer_name.as_str(), "gateway write failed: {}", err);
                    break;
                }
            }
            writer_connected.store(false, Ordering::SeqCst);
            let _ = write.close().await;
        });

        let reader_connected = Arc::clone(&connected);
        let reader_ready = Arc::clone(&ready);
        let reader_outbound = outbound.clone();
        let reader_in_flight = Arc::clone(&in_flight);
        let reader_name = username.clone();
        let reader = tokio::spawn(async move {
            while let Some(next) = read.next().await {
                match next {
                    Ok(Message::Text(text)) => {
                        let Some(frame) = parse_frame(&text) else {
                            debug!(username = reader_name.as_str(), "ignoring malformed gateway frame");
                            continue;
                        };
                        match frame.into_event() {
                            GatewayEvent::InspectResult(item) => {
                                reader_in_flight
                                    .lock()
                                    .await
                                    .retain(|_, asset_id| *asset_id != item.item_id);
                                sink.deliver(&reader_name, item)
                            }
                            GatewayEvent::Status(available) => {
                                reader_ready.store(available, Ordering::SeqCst)
                            }
                            GatewayEvent::Throttled => {
                                reader_ready.store(false, Ordering::SeqCst);
                                sink.throttled(&reader_name);
                            }
                            GatewayEvent::Failed { echo, error } => {
                                let asset_id = match &echo {
                                    Some(echo) => reader_in_flight.lock().await.remove(echo),
                                    None => None,
                                };
                                match asset_id {
                                    Some(asset_id) => sink.failed(&reader_name, asset_id, &error),
                                    None => warn!(
                                        username = reader_name.as_str(),
                                        ?echo,
                                        "gateway request failed: {}",
                                        error
                                    ),
                                }
                            }
                            GatewayEvent::Ignored => {}
                        }
                    }
                    Ok(Message::Ping(bytes)) => {
                        let _ = reader_outbound.send(Message::Pong(bytes));
                    }
                    Ok(Message::Close(frame)) => {
                        warn!(username = reader_name.as_str(), "gateway closed session: {:?}", frame);
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(username = reader_name.as_str(), "gateway stream error: {}", err);
                        break;
                    }
                }
            }
            reader_connected.store(false, Ordering::SeqCst);
        });

        Self {
            username,
            outbound,
            in_flight,
            connected,
            ready,
            tasks: vec![writer, reader],
        }
    }
}

impl Drop for GatewayWorker {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[async_trait]
impl InspectWorker for GatewayWorker {
    fn username(&self) -> &str {
        &self.username
    }

    fn is_available(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.ready.load(Ordering::SeqCst)
    }

    async fn inspect_item(
        &self,
        owner: &str,
        asset_id: u64,
        decode_token: &str,
    ) -> Result<(), WorkerSendError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(WorkerSendError("gateway session closed".to_string()));
        }
        let echo = Uuid::new_v4().to_string();
        let request = inspect_request(owner, asset_id, decode_token, &echo);
        self.in_flight.lock().await.insert(echo.clone(), asset_id);
        if self.outbound.send(Message::Text(request)).is_err() {
            self.in_flight.lock().await.remove(&echo);
            return Err(WorkerSendError("gateway session closed".to_string()));
        }
        Ok(())
    }
}

fn login_request(credential: &Credential, proxy_url: Option<&str>, echo: &str) -> String {
    let mut params = json!({
        "username": credential.username,
        "password": credential.password,
    });
    if let Some(proxy_url) = proxy_url {
        params["proxy_url"] = Value::String(proxy_url.to_string());
    }
    json!({
        "action": "login",
        "params": params,
        "echo": echo,
    })
    .to_string()
}

fn inspect_request(owner: &str, asset_id: u64, decode_token: &str, echo: &str) -> String {
    json!({
        "action": "inspect",
        "params": {
            "s": owner,
            "a": asset_id.to_string(),
            "d": decode_token,
        },
        "echo": echo,
    })
    .to_string()
}

#[derive(Debug, Default, Deserialize)]
struct GatewayFrame {
    #[serde(default)]
    echo: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    available: Option<bool>,
}

#[derive(Debug, PartialEq)]
enum GatewayEvent {
    InspectResult(RawItem),
    Status(bool),
    Throttled,
    Failed { echo: Option<String>, error: String },
    Ignored,
}

fn parse_frame(text: &str) -> Option<GatewayFrame> {
    serde_json::from_str(text).ok()
}

impl GatewayFrame {
    fn into_event(self) -> GatewayEvent {
        match self.event.as_deref() {
            Some("inspectResult") => self
                .data
                .and_then(|data| serde_json::from_value::<RawItem>(data).ok())
                .map(GatewayEvent::InspectResult)
                .unwrap_or(GatewayEvent::Ignored),
            Some("status") => self
                .available
                .map(GatewayEvent::Status)
                .unwrap_or(GatewayEvent::Ignored),
            Some("error") if self.error.as_deref() == Some(LOGIN_THROTTLED) => GatewayEvent::Throttled,
            _ if self.status.as_deref() == Some("failed") => GatewayEvent::Failed {
                echo: self.echo,
                error: self.error.unwrap_or_default(),
            },
            _ => GatewayEvent::Ignored,
        }
    }
}
