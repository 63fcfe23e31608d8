//! Embedded wallet frame transport
//!
//! The frame is a process-wide resource: [`FrameHost`] mounts it exactly
//! once, the application's embedder glue claims the counterpart end
//! ([`FrameWindow`]) and forwards messages to and from the sandboxed wallet
//! surface. The frame starts hidden; the channel toggles visibility while a
//! request is outstanding, and the watch-observable flag is what the wallet
//! UI uses to know when to appear.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc, watch};

use crate::error::ChannelError;

/// Capacity of the inbound event fan-out buffer
const INBOUND_BUFFER: usize = 64;

/// Frame configuration
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Origin the wallet surface is served from
    pub wallet_origin: String,
    /// URL loaded into the frame
    pub wallet_url: String,
}

/// A raw inbound message: the posting window's origin and its data
#[derive(Debug, Clone)]
pub struct FrameEvent {
    pub origin: String,
    pub data: serde_json::Value,
}

struct FrameShared {
    config: FrameConfig,
    mounted: AtomicBool,
    loaded: AtomicBool,
    visible: watch::Sender<bool>,
    outbound: mpsc::UnboundedSender<serde_json::Value>,
    inbound: broadcast::Sender<FrameEvent>,
}

/// Application-side handle to the embedded wallet frame
#[derive(Clone)]
pub struct WalletFrame {
    shared: Arc<FrameShared>,
}

impl WalletFrame {
    fn mount(config: FrameConfig) -> (Self, FrameWindow) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, _) = broadcast::channel(INBOUND_BUFFER);
        let (visible_tx, _) = watch::channel(false);

        let shared = Arc::new(FrameShared {
            config,
            mounted: AtomicBool::new(true),
            loaded: AtomicBool::new(false),
            visible: visible_tx,
            outbound: outbound_tx,
            inbound: inbound_tx,
        });

        let frame = Self {
            shared: shared.clone(),
        };
        let window = FrameWindow {
            shared,
            outbound: outbound_rx,
        };
        (frame, window)
    }

    /// Post a message to the frame's content.
    ///
    /// Fails with [`ChannelError::NotReady`] when the frame is unmounted or
    /// its content has not finished loading.
    pub fn send(&self, message: serde_json::Value) -> Result<(), ChannelError> {
        if !self.is_mounted() || !self.shared.loaded.load(Ordering::SeqCst) {
            return Err(ChannelError::NotReady);
        }
        self.shared
            .outbound
            .send(message)
            .map_err(|_| ChannelError::NotReady)
    }

    /// Subscribe to the raw inbound `(origin, data)` stream
    pub fn subscribe(&self) -> broadcast::Receiver<FrameEvent> {
        self.shared.inbound.subscribe()
    }

    pub fn show(&self) {
        if self.is_mounted() {
            self.shared.visible.send_replace(true);
        }
    }

    pub fn hide(&self) {
        self.shared.visible.send_replace(false);
    }

    /// Observe visibility changes
    pub fn visibility(&self) -> watch::Receiver<bool> {
        self.shared.visible.subscribe()
    }

    pub fn is_visible(&self) -> bool {
        *self.shared.visible.borrow()
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.mounted.load(Ordering::SeqCst)
    }

    pub fn wallet_origin(&self) -> &str {
        &self.shared.config.wallet_origin
    }

    pub fn wallet_url(&self) -> &str {
        &self.shared.config.wallet_url
    }

    fn unmount(&self) {
        self.shared.mounted.store(false, Ordering::SeqCst);
        self.shared.loaded.store(false, Ordering::SeqCst);
        self.hide();
    }
}

/// The embedder's end of the frame: receives outbound messages, posts
/// inbound ones, and reports content readiness.
pub struct FrameWindow {
    shared: Arc<FrameShared>,
    outbound: mpsc::UnboundedReceiver<serde_json::Value>,
}

impl FrameWindow {
    /// Next message posted by the application, `None` once torn down
    pub async fn recv(&mut self) -> Option<serde_json::Value> {
        self.outbound.recv().await
    }

    /// Post a message into the application, tagged with its origin
    pub fn post(&self, origin: impl Into<String>, data: serde_json::Value) {
        let event = FrameEvent {
            origin: origin.into(),
            data,
        };
        // No subscriber means no exchange is listening; that is not an error.
        let _ = self.shared.inbound.send(event);
    }

    /// Signal that the frame's content finished loading
    pub fn notify_loaded(&self) {
        self.shared.loaded.store(true, Ordering::SeqCst);
    }

    /// Observe visibility changes, the cue for the wallet UI to appear
    pub fn visibility(&self) -> watch::Receiver<bool> {
        self.shared.visible.subscribe()
    }

    /// The configured trusted origin, convenient for posting as the wallet
    pub fn wallet_origin(&self) -> String {
        self.shared.config.wallet_origin.clone()
    }
}

/// Owns the frame singleton: mounts lazily, tears down explicitly.
#[derive(Default)]
pub struct FrameHost {
    inner: Mutex<HostInner>,
}

#[derive(Default)]
struct HostInner {
    frame: Option<WalletFrame>,
    window: Option<FrameWindow>,
}

impl FrameHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount the wallet frame, hidden. A second call is a no-op that
    /// returns the existing frame.
    pub fn mount(&self, config: FrameConfig) -> WalletFrame {
        let mut inner = self.inner.lock().expect("frame host lock poisoned");
        if let Some(frame) = &inner.frame {
            tracing::debug!("wallet frame already mounted");
            return frame.clone();
        }

        tracing::info!(url = %config.wallet_url, "mounting wallet frame");
        let (frame, window) = WalletFrame::mount(config);
        inner.frame = Some(frame.clone());
        inner.window = Some(window);
        frame
    }

    /// The mounted frame, if any
    pub fn frame(&self) -> Option<WalletFrame> {
        self.inner
            .lock()
            .expect("frame host lock poisoned")
            .frame
            .clone()
    }

    /// Claim the embedder's end. Yields once per mount.
    pub fn take_window(&self) -> Option<FrameWindow> {
        self.inner
            .lock()
            .expect("frame host lock poisoned")
            .window
            .take()
    }

    /// Unmount the frame; subsequent sends fail with `NotReady`.
    pub fn teardown(&self) {
        let mut inner = self.inner.lock().expect("frame host lock poisoned");
        if let Some(frame) = inner.frame.take() {
            tracing::info!("tearing down wallet frame");
            frame.unmount();
        }
        inner.window = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> FrameConfig {
        FrameConfig {
            wallet_origin: "https://wallet.test".to_string(),
            wallet_url: "https://wallet.test/connector/wallet".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mount_is_idempotent() {
        let host = FrameHost::new();
        let first = host.mount(config());
        let second = host.mount(config());

        let mut window = host.take_window().unwrap();
        window.notify_loaded();

        // Both handles reach the same window.
        second.send(json!({"type": "PING"})).unwrap();
        let received = window.recv().await.unwrap();
        assert_eq!(received["type"], "PING");
        assert!(first.is_mounted());
        assert!(host.take_window().is_none());
    }

    #[tokio::test]
    async fn test_send_before_load_fails() {
        let host = FrameHost::new();
        let frame = host.mount(config());
        let _window = host.take_window().unwrap();

        let err = frame.send(json!({"type": "PING"})).unwrap_err();
        assert!(matches!(err, ChannelError::NotReady));
    }

    #[tokio::test]
    async fn test_teardown_unmounts() {
        let host = FrameHost::new();
        let frame = host.mount(config());
        let window = host.take_window().unwrap();
        window.notify_loaded();
        frame.show();

        host.teardown();
        assert!(!frame.is_mounted());
        assert!(!frame.is_visible());
        assert!(matches!(
            frame.send(json!({"type": "PING"})),
            Err(ChannelError::NotReady)
        ));
    }

    #[tokio::test]
    async fn test_starts_hidden_and_visibility_observable() {
        let host = FrameHost::new();
        let frame = host.mount(config());
        let window = host.take_window().unwrap();

        let vis = window.visibility();
        assert!(!*vis.borrow());

        frame.show();
        assert!(*vis.borrow());
        frame.hide();
        assert!(!*vis.borrow());
    }
}
