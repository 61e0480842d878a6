use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tungstenite::{accept, Message, WebSocket};

use crate::error::Result;
use crate::input::{ControlInput, InputEvent, SharedInput};
use crate::state::WifiConfig;

/// Messages from the remote UI.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputMessage {
    Input {
        #[serde(default)]
        timestamp: u64,
        #[serde(flatten)]
        input: ControlInput,
    },
    Wifi {
        ssid: String,
        password: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub timestamp: u64,
    pub throttle: u16,
    pub error: Option<String>,
}

pub const BUSY_ERROR: &str = "another client is connected";

/// Accepts UI clients and feeds their input into `shared`. One client
/// drives at a time; others are told so and closed.
pub struct WebSocketFeeder {
    listener: TcpListener,
    shared: SharedInput,
    events: Sender<InputEvent>,
    ready_sent: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
}

impl WebSocketFeeder {
    pub fn bind(address: &str, shared: SharedInput, events: Sender<InputEvent>) -> Result<Self> {
        let listener = TcpListener::bind(address)?;
        log::info!("WebSocket server listening on {}", listener.local_addr()?);
        Ok(WebSocketFeeder {
            listener,
            shared,
            events,
            ready_sent: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve clients forever, one thread each.
    pub fn run(self) {
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    log::warn!("Connection error: {}", e);
                    continue;
                }
            };

            let client = Client {
                shared: self.shared.clone(),
                events: self.events.clone(),
                ready_sent: Arc::clone(&self.ready_sent),
                active: Arc::clone(&self.active),
            };
            thread::spawn(move || client.serve(stream));
        }
    }
}

struct Client {
    shared: SharedInput,
    events: Sender<InputEvent>,
    ready_sent: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
}

impl Client {
    fn serve(self, stream: TcpStream) {
        let peer = stream.peer_addr().ok();
        let mut websocket = match accept(stream) {
            Ok(ws) => ws,
            Err(e) => {
                log::warn!("WebSocket handshake error: {}", e);
                return;
            }
        };

        if self.active.swap(true, Ordering::SeqCst) {
            log::warn!("[CLIENT] Refused {:?}: {}", peer, BUSY_ERROR);
            self.refuse(&mut websocket);
            return;
        }

        log::info!("[CLIENT] Connected {:?}", peer);
        if !self.ready_sent.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(InputEvent::Ready);
        }

        self.read_loop(&mut websocket);

        log::info!("[CLIENT] Disconnected {:?}", peer);
        if let Some(enable) = self.shared.release() {
            let _ = self.events.send(InputEvent::Switch(enable));
        }
        self.active.store(false, Ordering::SeqCst);
    }

    fn refuse(&self, websocket: &mut WebSocket<TcpStream>) {
        if let Ok(json) = serde_json::to_string(&self.ack(0, Some(BUSY_ERROR.to_string()))) {
            let _ = websocket.send(Message::Text(json));
        }
        let _ = websocket.close(None);
        // drain until the peer acknowledges the close
        let _ = websocket.get_ref().set_read_timeout(Some(Duration::from_secs(1)));
        while websocket.read().is_ok() {}
    }

    fn read_loop(&self, websocket: &mut WebSocket<TcpStream>) {
        loop {
            let text = match websocket.read() {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    log::warn!("WebSocket error: {}", e);
                    break;
                }
            };

            let ack = match serde_json::from_str::<InputMessage>(&text) {
                Ok(message) => self.handle(message),
                Err(e) => {
                    log::warn!("JSON parse error: {}", e);
                    self.ack(0, Some(e.to_string()))
                }
            };

            match serde_json::to_string(&ack) {
                Ok(json) => {
                    if websocket.send(Message::Text(json)).is_err() {
                        break;
                    }
                }
                Err(e) => log::warn!("JSON serialization error: {}", e),
            }
        }
    }

    fn handle(&self, message: InputMessage) -> AckMessage {
        match message {
            InputMessage::Input { timestamp, input } => {
                if let Some(enable) = self.shared.update(input) {
                    let _ = self.events.send(InputEvent::Switch(enable));
                }
                self.ack(timestamp, None)
            }
            InputMessage::Wifi { ssid, password } => {
                let config = WifiConfig::new(ssid, password);
                match config.validate() {
                    Ok(()) => {
                        let _ = self.events.send(InputEvent::Provision(config));
                        self.ack(0, None)
                    }
                    Err(e) => {
                        log::warn!("Rejected Wi-Fi config: {}", e);
                        self.ack(0, Some(e.to_string()))
                    }
                }
            }
        }
    }

    fn ack(&self, timestamp: u64, error: Option<String>) -> AckMessage {
        AckMessage {
            msg_type: String::from("ack"),
            timestamp,
            throttle: self.shared.snapshot().throttle,
            error,
        }
    }
}
