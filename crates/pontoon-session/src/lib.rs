//! Pontoon session: who is connected and how
//!
//! The single place that may mutate connection state. Supplies the active
//! signer to the bridge workflow, persists the address/variant pair across
//! restarts, and silently re-attaches local sessions on startup. Remote
//! sessions are never silently restored; reconnecting one always requires a
//! fresh handshake through the wallet channel.

pub mod store;

use std::sync::{Arc, Weak};

use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use evm_node_client::ChainReader;
use pontoon_core::{validate_address, Address, SignerVariant, WalletIdentity};
use pontoon_signer::{
    LocalProvider, LocalSigner, ProviderError, ProviderEvent, RemoteSigner, Signer,
};
use wallet_channel::{ChannelError, WalletBridgeChannel};

pub use store::{JsonFileStore, MemoryStore, PersistedSession, SessionStore};

/// Errors that can occur while managing the session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No wallet provider available")]
    NoProviderAvailable,

    #[error("Already connected with the {active} signer; disconnect first")]
    AlreadyConnected { active: SignerVariant },

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid wallet address: {reason}")]
    InvalidAddress { reason: String },
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

struct SessionInner {
    identity: RwLock<WalletIdentity>,
    store: Box<dyn SessionStore>,
    provider: Option<Arc<dyn LocalProvider>>,
    channel: Option<Arc<WalletBridgeChannel>>,
    chain: Arc<dyn ChainReader>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

/// Wallet session state, cheap to clone and share
#[derive(Clone)]
pub struct WalletSession {
    inner: Arc<SessionInner>,
}

impl WalletSession {
    pub fn new(
        store: Box<dyn SessionStore>,
        provider: Option<Arc<dyn LocalProvider>>,
        channel: Option<Arc<WalletBridgeChannel>>,
        chain: Arc<dyn ChainReader>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                identity: RwLock::new(WalletIdentity::none()),
                store,
                provider,
                channel,
                chain,
                watcher: Mutex::new(None),
            }),
        }
    }

    /// Current identity
    pub async fn identity(&self) -> WalletIdentity {
        self.inner.identity.read().await.clone()
    }

    /// Connected account address, if any
    pub async fn address(&self) -> Option<Address> {
        self.inner.identity.read().await.address().cloned()
    }

    pub async fn connected(&self) -> bool {
        self.inner.identity.read().await.connected()
    }

    /// Connect through the locally-injected provider.
    ///
    /// A no-op when a local session already exists; fails with
    /// [`SessionError::AlreadyConnected`] when a remote one does.
    pub async fn connect_local(&self) -> Result<WalletIdentity> {
        {
            let current = self.inner.identity.read().await;
            match current.variant() {
                SignerVariant::Local => return Ok(current.clone()),
                SignerVariant::Remote => {
                    return Err(SessionError::AlreadyConnected {
                        active: SignerVariant::Remote,
                    })
                }
                SignerVariant::None => {}
            }
        }

        let provider = self
            .inner
            .provider
            .clone()
            .ok_or(SessionError::NoProviderAvailable)?;

        let accounts = provider.request_accounts().await?;
        let address = accounts
            .into_iter()
            .next()
            .ok_or(SessionError::Provider(ProviderError::Rejected {
                message: "no accounts authorized".to_string(),
            }))?;

        let identity = WalletIdentity::local(address);
        self.apply(identity.clone()).await;
        self.watch_provider(provider).await;
        tracing::info!(address = ?identity.address(), "local wallet connected");
        Ok(identity)
    }

    /// Connect through the remote wallet, one connect exchange.
    pub async fn connect_remote(&self) -> Result<WalletIdentity> {
        {
            let current = self.inner.identity.read().await;
            if current.connected() {
                return Err(SessionError::AlreadyConnected {
                    active: current.variant(),
                });
            }
        }

        let channel = self
            .inner
            .channel
            .clone()
            .ok_or(SessionError::Channel(ChannelError::NotReady))?;

        let payload = channel.request_connect().await?;
        let address = payload
            .address
            .ok_or_else(|| SessionError::InvalidAddress {
                reason: "connect response carried no address".to_string(),
            })?;
        validate_address(&address).map_err(|e| SessionError::InvalidAddress {
            reason: e.to_string(),
        })?;

        let identity = WalletIdentity::remote(Address::new(address));
        self.apply(identity.clone()).await;
        tracing::info!(address = ?identity.address(), "remote wallet connected");
        Ok(identity)
    }

    /// Re-attach a previously-persisted session on startup.
    ///
    /// Local sessions re-attach silently through `accounts()`; remote ones
    /// are cleared, a fresh handshake is always required for them.
    pub async fn restore(&self) -> WalletIdentity {
        let Some(persisted) = self.inner.store.load() else {
            return WalletIdentity::none();
        };

        match persisted.variant {
            SignerVariant::Local => {
                let Some(provider) = self.inner.provider.clone() else {
                    tracing::warn!("persisted local session but no provider; clearing");
                    self.clear().await;
                    return WalletIdentity::none();
                };
                match provider.accounts().await {
                    Ok(accounts) if !accounts.is_empty() => {
                        let address = accounts.into_iter().next().unwrap_or_else(|| {
                            Address::new(persisted.address.clone())
                        });
                        let identity = WalletIdentity::local(address);
                        self.apply(identity.clone()).await;
                        self.watch_provider(provider).await;
                        tracing::info!(address = ?identity.address(), "local session restored");
                        identity
                    }
                    _ => {
                        tracing::info!("persisted local session no longer authorized; clearing");
                        self.clear().await;
                        WalletIdentity::none()
                    }
                }
            }
            SignerVariant::Remote | SignerVariant::None => {
                self.clear().await;
                WalletIdentity::none()
            }
        }
    }

    /// Drop the identity, in memory and on disk, whichever variant is active.
    pub async fn disconnect(&self) {
        if let Some(handle) = self.inner.watcher.lock().await.take() {
            handle.abort();
        }
        self.clear().await;
        tracing::info!("wallet disconnected");
    }

    /// Mint the signer for the active backend.
    pub async fn active_signer(&self) -> Option<Signer> {
        let identity = self.inner.identity.read().await.clone();
        let address = identity.address()?.clone();

        match identity.variant() {
            SignerVariant::Local => {
                let provider = self.inner.provider.clone()?;
                Some(Signer::Local(LocalSigner::new(
                    address,
                    provider,
                    self.inner.chain.clone(),
                )))
            }
            SignerVariant::Remote => {
                let channel = self.inner.channel.clone()?;
                Some(Signer::Remote(RemoteSigner::new(address, channel)))
            }
            SignerVariant::None => None,
        }
    }

    async fn apply(&self, identity: WalletIdentity) {
        persist(&self.inner, &identity);
        *self.inner.identity.write().await = identity;
    }

    async fn clear(&self) {
        *self.inner.identity.write().await = WalletIdentity::none();
        self.inner.store.clear();
    }

    /// Follow provider notifications for the lifetime of the session.
    async fn watch_provider(&self, provider: Arc<dyn LocalProvider>) {
        let mut events = provider.subscribe();
        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "provider event stream lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else { break };

                match event {
                    ProviderEvent::AccountsChanged(accounts) => {
                        match accounts.into_iter().next() {
                            Some(address) => {
                                tracing::info!(%address, "provider switched accounts");
                                let identity = WalletIdentity::local(address);
                                persist(&inner, &identity);
                                *inner.identity.write().await = identity;
                            }
                            None => {
                                tracing::info!("provider revoked all accounts");
                                *inner.identity.write().await = WalletIdentity::none();
                                inner.store.clear();
                            }
                        }
                    }
                    ProviderEvent::Disconnected => {
                        tracing::info!("provider disconnected");
                        *inner.identity.write().await = WalletIdentity::none();
                        inner.store.clear();
                    }
                }
            }
        });

        let mut watcher = self.inner.watcher.lock().await;
        if let Some(previous) = watcher.replace(handle) {
            previous.abort();
        }
    }
}

fn persist(inner: &SessionInner, identity: &WalletIdentity) {
    let Some(address) = identity.address() else {
        inner.store.clear();
        return;
    };
    let session = PersistedSession {
        address: address.to_string(),
        variant: identity.variant(),
    };
    if let Err(e) = inner.store.save(&session) {
        tracing::warn!("failed to persist session: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use evm_node_client::NodeError;
    use pontoon_core::{BridgeCall, ChainId, ContractAddress, TokenDescriptor, TxHash, TxOutcome};
    use serde_json::json;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::sync::broadcast;
    use wallet_channel::{FrameConfig, FrameHost, FrameWindow};

    const WALLET_ORIGIN: &str = "https://wallet.test";

    struct FakeChain;

    #[async_trait]
    impl ChainReader for FakeChain {
        async fn token_balance(
            &self,
            _token: &TokenDescriptor,
            _address: &Address,
        ) -> std::result::Result<String, NodeError> {
            Ok("0.0".to_string())
        }

        async fn allowance(
            &self,
            _token: &ContractAddress,
            _owner: &Address,
            _spender: &ContractAddress,
            _chain_id: ChainId,
        ) -> std::result::Result<String, NodeError> {
            Ok("0".to_string())
        }

        async fn wait_for_confirmation(
            &self,
            _rpc_url: &str,
            hash: &TxHash,
        ) -> std::result::Result<TxOutcome, NodeError> {
            Ok(TxOutcome {
                hash: hash.clone(),
                block_number: Some(1),
            })
        }
    }

    struct FakeProvider {
        accounts: StdMutex<Vec<Address>>,
        events: broadcast::Sender<ProviderEvent>,
    }

    impl FakeProvider {
        fn with_accounts(accounts: Vec<&str>) -> Arc<Self> {
            let (events, _) = broadcast::channel(8);
            Arc::new(Self {
                accounts: StdMutex::new(accounts.into_iter().map(Address::new).collect()),
                events,
            })
        }

        fn emit(&self, event: ProviderEvent) {
            let _ = self.events.send(event);
        }
    }

    #[async_trait]
    impl LocalProvider for FakeProvider {
        async fn request_accounts(&self) -> std::result::Result<Vec<Address>, ProviderError> {
            Ok(self.accounts.lock().unwrap().clone())
        }

        async fn accounts(&self) -> std::result::Result<Vec<Address>, ProviderError> {
            Ok(self.accounts.lock().unwrap().clone())
        }

        async fn send_approval(
            &self,
            _token: &ContractAddress,
            _spender: &ContractAddress,
            _amount: pontoon_signer::ApprovalAmount,
        ) -> std::result::Result<TxHash, ProviderError> {
            Ok(TxHash::new("0xapprove"))
        }

        async fn send_bridge(
            &self,
            _bridge: &ContractAddress,
            _call: &BridgeCall,
        ) -> std::result::Result<TxHash, ProviderError> {
            Ok(TxHash::new("0xbridge"))
        }

        fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
            self.events.subscribe()
        }
    }

    fn store_and_session(
        provider: Option<Arc<FakeProvider>>,
        channel: Option<Arc<WalletBridgeChannel>>,
    ) -> (Arc<MemoryStore>, WalletSession) {
        let store = Arc::new(MemoryStore::new());
        let session = WalletSession::new(
            Box::new(SharedStore(store.clone())),
            provider.map(|p| p as Arc<dyn LocalProvider>),
            channel,
            Arc::new(FakeChain),
        );
        (store, session)
    }

    /// Test adapter so assertions can see what the session persisted.
    struct SharedStore(Arc<MemoryStore>);

    impl SessionStore for SharedStore {
        fn load(&self) -> Option<PersistedSession> {
            self.0.load()
        }

        fn save(&self, session: &PersistedSession) -> std::io::Result<()> {
            self.0.save(session)
        }

        fn clear(&self) {
            self.0.clear()
        }
    }

    fn remote_channel() -> (Arc<WalletBridgeChannel>, FrameWindow) {
        let host = FrameHost::new();
        let frame = host.mount(FrameConfig {
            wallet_origin: WALLET_ORIGIN.to_string(),
            wallet_url: format!("{}/connector/wallet", WALLET_ORIGIN),
        });
        let window = host.take_window().unwrap();
        window.notify_loaded();
        (Arc::new(WalletBridgeChannel::new(frame)), window)
    }

    const OWNER: &str = "0x742d35Cc6634C0532925a3b844Bc9e7595f2bD08";

    #[tokio::test]
    async fn test_connect_local() {
        let provider = FakeProvider::with_accounts(vec![OWNER]);
        let (store, session) = store_and_session(Some(provider), None);

        let identity = session.connect_local().await.unwrap();
        assert_eq!(identity.variant(), SignerVariant::Local);
        assert!(session.connected().await);

        let persisted = store.snapshot().unwrap();
        assert_eq!(persisted.variant, SignerVariant::Local);
        assert_eq!(persisted.address, OWNER);
    }

    #[tokio::test]
    async fn test_connect_local_without_provider() {
        let (_, session) = store_and_session(None, None);
        let err = session.connect_local().await.unwrap_err();
        assert!(matches!(err, SessionError::NoProviderAvailable));
        assert!(!session.connected().await);
    }

    #[tokio::test]
    async fn test_connect_local_is_noop_when_already_local() {
        let provider = FakeProvider::with_accounts(vec![OWNER]);
        let (_, session) = store_and_session(Some(provider), None);

        let first = session.connect_local().await.unwrap();
        let second = session.connect_local().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_connect_remote() {
        let (channel, mut window) = remote_channel();
        let (store, session) = store_and_session(None, Some(channel));

        let responder = tokio::spawn(async move {
            let outbound = window.recv().await.unwrap();
            assert_eq!(outbound["type"], "REQUEST_CONNECT");
            window.post(
                WALLET_ORIGIN,
                json!({"type": "RESPONSE_CONNECT", "payload": {"address": OWNER}}),
            );
        });

        let identity = session.connect_remote().await.unwrap();
        responder.await.unwrap();
        assert_eq!(identity.variant(), SignerVariant::Remote);
        assert_eq!(store.snapshot().unwrap().variant, SignerVariant::Remote);
    }

    #[tokio::test]
    async fn test_connect_remote_rejects_switch_without_disconnect() {
        let provider = FakeProvider::with_accounts(vec![OWNER]);
        let (channel, _window) = remote_channel();
        let (_, session) = store_and_session(Some(provider), Some(channel));

        session.connect_local().await.unwrap();
        let err = session.connect_remote().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::AlreadyConnected {
                active: SignerVariant::Local
            }
        ));
    }

    #[tokio::test]
    async fn test_connect_remote_rejects_bad_address() {
        let (channel, mut window) = remote_channel();
        let (_, session) = store_and_session(None, Some(channel));

        let responder = tokio::spawn(async move {
            let _ = window.recv().await.unwrap();
            window.post(
                WALLET_ORIGIN,
                json!({"type": "RESPONSE_CONNECT", "payload": {"address": "garbage"}}),
            );
        });

        let err = session.connect_remote().await.unwrap_err();
        responder.await.unwrap();
        assert!(matches!(err, SessionError::InvalidAddress { .. }));
        assert!(!session.connected().await);
    }

    #[tokio::test]
    async fn test_account_change_resynchronizes() {
        let provider = FakeProvider::with_accounts(vec![OWNER]);
        let (store, session) = store_and_session(Some(provider.clone()), None);
        session.connect_local().await.unwrap();

        let other = "0x00000000000000000000000000000000000000aa";
        provider.emit(ProviderEvent::AccountsChanged(vec![Address::new(other)]));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(session.address().await.unwrap().as_str(), other);
        assert_eq!(store.snapshot().unwrap().address, other);
    }

    #[tokio::test]
    async fn test_revoked_accounts_tear_down_session() {
        let provider = FakeProvider::with_accounts(vec![OWNER]);
        let (store, session) = store_and_session(Some(provider.clone()), None);
        session.connect_local().await.unwrap();

        provider.emit(ProviderEvent::AccountsChanged(vec![]));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!session.connected().await);
        assert!(store.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_disconnect_then_restore_yields_none() {
        let provider = FakeProvider::with_accounts(vec![OWNER]);
        let (store, session) = store_and_session(Some(provider), None);
        session.connect_local().await.unwrap();

        session.disconnect().await;
        assert!(store.snapshot().is_none());

        let restored = session.restore().await;
        assert_eq!(restored.variant(), SignerVariant::None);
        assert!(restored.address().is_none());
    }

    #[tokio::test]
    async fn test_restore_local_is_silent() {
        let provider = FakeProvider::with_accounts(vec![OWNER]);
        let (store, session) = store_and_session(Some(provider), None);
        store
            .save(&PersistedSession {
                address: OWNER.to_string(),
                variant: SignerVariant::Local,
            })
            .unwrap();

        let restored = session.restore().await;
        assert_eq!(restored.variant(), SignerVariant::Local);
        assert_eq!(restored.address().unwrap().as_str(), OWNER);
    }

    #[tokio::test]
    async fn test_restore_never_resurrects_remote_sessions() {
        let (channel, _window) = remote_channel();
        let (store, session) = store_and_session(None, Some(channel));
        store
            .save(&PersistedSession {
                address: OWNER.to_string(),
                variant: SignerVariant::Remote,
            })
            .unwrap();

        let restored = session.restore().await;
        assert_eq!(restored.variant(), SignerVariant::None);
        // The stale pair is gone; a fresh handshake is required.
        assert!(store.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_active_signer_follows_variant() {
        let provider = FakeProvider::with_accounts(vec![OWNER]);
        let (_, session) = store_and_session(Some(provider), None);

        assert!(session.active_signer().await.is_none());
        session.connect_local().await.unwrap();
        let signer = session.active_signer().await.unwrap();
        assert_eq!(signer.variant(), SignerVariant::Local);
    }
}
