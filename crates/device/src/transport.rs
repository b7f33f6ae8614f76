//! Delivery channels between a session host and its devices.
//!
//! The runtime never talks to a socket directly. Each device holds a
//! [`Transport`], an opaque sink that delivers typed messages and answers
//! liveness questions. The [`LoopbackTransport`] keeps both ends in one
//! process for local sessions and tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// One framed message on the wire. `kind` tells the client what the
/// payload is; rendered views travel as `{"type": "view", "data": "..."}`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

/// Failure decoding a frame into an [`Envelope`].
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Envelope {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// An envelope whose payload is plain text, the shape device views
    /// are delivered in.
    pub fn text(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(kind, Value::String(text.into()))
    }

    pub fn from_frame(frame: &str) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_str(frame)?)
    }

    pub fn to_frame(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Contract between a device and whatever carries its messages.
///
/// Sending never reports failure; a transport that is not open drops the
/// message without queueing it. Liveness follows the heartbeat pattern:
/// the host clears `is_alive`, sends a ping and expects the far end to
/// set the flag again before the next check.
pub trait Transport: Send {
    /// Delivers one typed message. No-op when the channel is not open.
    fn send(&mut self, kind: &str, payload: &str);
    fn is_alive(&self) -> bool;
    fn set_alive(&mut self, alive: bool);
    /// Asks the far end to prove it is still there.
    fn ping(&mut self);
    fn terminate(&mut self);
    /// Stable name of the far end, used to derive device uids.
    fn remote_address(&self) -> String;
}

#[derive(Debug)]
struct SharedLoopbackState {
    open: AtomicBool,
    alive: AtomicBool,
    pings: AtomicUsize,
    frames: Mutex<VecDeque<String>>,
}

impl SharedLoopbackState {
    fn new() -> Self {
        Self {
            open: AtomicBool::new(true),
            alive: AtomicBool::new(true),
            pings: AtomicUsize::new(0),
            frames: Mutex::new(VecDeque::new()),
        }
    }

    fn push_frame(&self, frame: String) {
        if let Ok(mut queue) = self.frames.lock() {
            queue.push_back(frame);
        }
    }

    fn drain_frames(&self) -> VecDeque<String> {
        if let Ok(mut queue) = self.frames.lock() {
            return std::mem::take(&mut *queue);
        }

        VecDeque::new()
    }
}

/// A pair of connected loopback halves: the transport a [`Device`] owns
/// and the remote handle a test or local client reads from.
///
/// [`Device`]: crate::Device
pub struct LoopbackPair {
    pub transport: LoopbackTransport,
    pub remote: LoopbackRemote,
}

impl LoopbackPair {
    pub fn new() -> Self {
        let state = Arc::new(SharedLoopbackState::new());
        Self {
            transport: LoopbackTransport {
                state: Arc::clone(&state),
            },
            remote: LoopbackRemote { state },
        }
    }
}

impl Default for LoopbackPair {
    fn default() -> Self {
        Self::new()
    }
}

/// Host-side loopback half. Frames pile up in a shared queue the
/// [`LoopbackRemote`] drains.
pub struct LoopbackTransport {
    state: Arc<SharedLoopbackState>,
}

impl std::fmt::Debug for LoopbackTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackTransport")
            .field("open", &self.state.open.load(Ordering::SeqCst))
            .finish()
    }
}

impl Transport for LoopbackTransport {
    fn send(&mut self, kind: &str, payload: &str) {
        if !self.state.open.load(Ordering::SeqCst) {
            return;
        }
        match Envelope::text(kind, payload).to_frame() {
            Ok(frame) => self.state.push_frame(frame),
            Err(error) => warn!("loopback frame dropped: {error}"),
        }
    }

    fn is_alive(&self) -> bool {
        self.state.alive.load(Ordering::SeqCst)
    }

    fn set_alive(&mut self, alive: bool) {
        self.state.alive.store(alive, Ordering::SeqCst);
    }

    fn ping(&mut self) {
        self.state.pings.fetch_add(1, Ordering::SeqCst);
    }

    fn terminate(&mut self) {
        self.state.open.store(false, Ordering::SeqCst);
    }

    fn remote_address(&self) -> String {
        "loopback".into()
    }
}

/// Client-side loopback half.
pub struct LoopbackRemote {
    state: Arc<SharedLoopbackState>,
}

impl LoopbackRemote {
    /// Takes every frame delivered since the last drain.
    pub fn drain(&self) -> Vec<String> {
        self.state.drain_frames().into()
    }

    /// Answers the host's ping, as a live client would.
    pub fn pong(&self) {
        self.state.alive.store(true, Ordering::SeqCst);
    }

    pub fn pings(&self) -> usize {
        self.state.pings.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for LoopbackRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackRemote")
            .field("open", &self.state.open.load(Ordering::SeqCst))
            .field("pings", &self.state.pings.load(Ordering::SeqCst))
            .finish()
    }
}
