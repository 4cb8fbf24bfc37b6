//! Transport session lifecycle.
//!
//! [`SessionManager`] owns the way the bridge reaches the device. Every
//! operation runs inside a scope that acquires a transport, binds the device
//! application, runs the operation and releases the transport again:
//!
//! ```text
//! Idle -> Discovering -> Bound -> Executing -> Released
//!              |                      |
//!              +-------> Failed <-----+
//! ```
//!
//! In [`DiscoveryMode::CompanionBridge`] the endpoint may not be running yet.
//! Discovery then asks the environment to launch the companion once and
//! probes the endpoint at a fixed interval until it answers, the attempt bound
//! is exhausted, or [`CancelHandle::cancel`] is called. A successful operation
//! keeps the bridge session warm for the next one.
//!
//! An async mutex serializes operations: a second caller waits until the
//! first one has released (or parked) its session.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use async_lock::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::app::LedgerApp;
use crate::config::{BridgeConfig, DiscoveryMode};
use crate::error::{Error, Result};
use crate::fields::{DeviceVersion, EncodingStrategy};
use crate::transport::{Connector, Transport};

/// Observable lifecycle state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionState {
    /// Nothing was attempted yet.
    Idle,

    /// Looking for a reachable transport.
    Discovering,

    /// A transport is held and bound to the device application.
    Bound,

    /// An operation is running on the held transport.
    Executing,

    /// The last session was closed.
    Released,

    /// The last operation failed; nothing is held.
    Failed,
}

impl SessionState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Discovering,
            2 => Self::Bound,
            3 => Self::Executing,
            4 => Self::Released,
            _ => Self::Failed,
        }
    }
}

/// Requests cancellation of a running discovery.
///
/// Cloning yields a handle to the same flag. The flag is read without taking
/// the session guard, so it can be raised while an operation holds it.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Raises the cancellation flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Non-blocking cancellation check.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A transport bound to the device application.
struct HeldSession<T> {
    app: LedgerApp<T>,
    version: Option<DeviceVersion>,
}

impl<T: Transport> HeldSession<T> {
    const fn new(transport: T) -> Self {
        Self {
            app: LedgerApp::new(transport),
            version: None,
        }
    }

    /// Returns the encoding strategy, reading the device version at most once.
    async fn strategy(&mut self) -> Result<EncodingStrategy> {
        let version = match self.version {
            Some(version) => version,
            None => {
                let version = self.app.get_configuration().await?.version;
                self.version = Some(version);
                version
            }
        };
        Ok(EncodingStrategy::for_version(version))
    }

    async fn close(self) {
        self.app.into_transport().close().await;
    }
}

/// State behind the session guard.
struct Inner<T> {
    mode: DiscoveryMode,
    held: Option<HeldSession<T>>,

    /// Set while an operation runs. Still set on the next lock when the
    /// operation's future was dropped before it settled.
    in_flight: bool,
}

/// Scoped acquire, use and release of device sessions.
pub struct SessionManager<C: Connector> {
    connector: C,
    config: BridgeConfig,
    inner: Mutex<Inner<C::Transport>>,
    state: AtomicU8,
    cancel: CancelHandle,
}

impl<C: Connector> fmt::Debug for SessionManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<C: Connector> SessionManager<C> {
    /// Creates a manager in the configuration's initial mode.
    ///
    /// A `poll_attempts` of zero is raised to one.
    #[must_use]
    pub fn new(connector: C, mut config: BridgeConfig) -> Self {
        if config.poll_attempts == 0 {
            warn!("poll_attempts must be at least 1, probing once");
            config.poll_attempts = 1;
        }
        let mode = config.initial_mode;
        Self {
            connector,
            config,
            inner: Mutex::new(Inner {
                mode,
                held: None,
                in_flight: false,
            }),
            state: AtomicU8::new(SessionState::Idle as u8),
            cancel: CancelHandle::default(),
        }
    }

    /// Returns the host connector.
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Returns a handle able to cancel discovery.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancels a running discovery.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns the discovery mode, waiting for any running operation.
    pub async fn mode(&self) -> DiscoveryMode {
        self.inner.lock().await.mode
    }

    /// Runs `op` on a bound device application.
    ///
    /// If the returned future is dropped before it completes, the session it
    /// held is closed by the next call that takes the guard.
    ///
    /// # Errors
    ///
    /// Returns discovery errors, or the error of `op`. The session is
    /// released before the error is returned.
    pub async fn with_session<R, F>(&self, op: F) -> Result<R>
    where
        F: AsyncFnOnce(&mut LedgerApp<C::Transport>) -> Result<R>,
    {
        let mut inner = self.begin().await;
        let held = self.acquire(&mut inner).await?;

        self.set_state(SessionState::Executing);
        let result = op(&mut held.app).await;
        self.settle(&mut inner, result).await
    }

    /// Runs `op` with the encoding strategy of the bound device.
    ///
    /// The device version is read once per held session.
    ///
    /// # Errors
    ///
    /// Same as [`with_session`](Self::with_session), plus the errors of
    /// reading the device version.
    pub async fn with_signing_session<R, F>(&self, op: F) -> Result<R>
    where
        F: AsyncFnOnce(&mut LedgerApp<C::Transport>, EncodingStrategy) -> Result<R>,
    {
        let mut inner = self.begin().await;
        let held = self.acquire(&mut inner).await?;

        let strategy = match held.strategy().await {
            Ok(strategy) => strategy,
            Err(err) => return self.settle(&mut inner, Err(err)).await,
        };

        self.set_state(SessionState::Executing);
        let result = op(&mut held.app, strategy).await;
        self.settle(&mut inner, result).await
    }

    /// Switches the discovery mode, releasing any held session first.
    pub async fn set_mode(&self, mode: DiscoveryMode) {
        let mut inner = self.inner.lock().await;
        self.reset(&mut inner).await;
        info!(from = ?inner.mode, to = ?mode, "switching discovery mode");
        inner.mode = mode;
    }

    /// Releases any held session.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        self.reset(&mut inner).await;
    }

    async fn begin(&self) -> MutexGuard<'_, Inner<C::Transport>> {
        let mut inner = self.inner.lock().await;
        self.cancel.reset();
        if inner.in_flight {
            warn!("previous operation was abandoned, releasing its session");
            self.reset(&mut inner).await;
        }
        inner.in_flight = true;
        inner
    }

    /// Closes the held session and clears an abandoned operation.
    async fn reset(&self, inner: &mut Inner<C::Transport>) {
        let abandoned = core::mem::take(&mut inner.in_flight);
        if self.release(inner).await || abandoned {
            self.set_state(SessionState::Released);
        }
    }

    /// Closes the held session, if any. Returns whether one was held.
    async fn release(&self, inner: &mut Inner<C::Transport>) -> bool {
        match inner.held.take() {
            Some(held) => {
                debug!("releasing session");
                held.close().await;
                true
            }
            None => false,
        }
    }

    /// Binds a session, reusing a warm bridge session when it still answers.
    ///
    /// The returned session stays in `inner` while the operation runs.
    async fn acquire<'a>(
        &self,
        inner: &'a mut Inner<C::Transport>,
    ) -> Result<&'a mut HeldSession<C::Transport>> {
        let mode = inner.mode;
        let url = self.config.bridge_url.as_str();

        let warm = mode == DiscoveryMode::CompanionBridge
            && inner.held.is_some()
            && self.connector.probe_bridge(url).await.is_ok();
        let reused = if warm {
            debug!(url, "reusing warm bridge session");
            inner.held.take()
        } else {
            if inner.held.is_some() && mode == DiscoveryMode::CompanionBridge {
                warn!(url, "bridge went away, dropping warm session");
            }
            self.release(inner).await;
            None
        };

        let held = match reused {
            Some(held) => held,
            None => {
                self.set_state(SessionState::Discovering);
                let opened = match mode {
                    DiscoveryMode::Direct => self.open_direct().await,
                    DiscoveryMode::CompanionBridge => self.open_companion(url).await,
                };
                match opened {
                    Ok(held) => held,
                    Err(err) => {
                        warn!(%err, ?mode, "session discovery failed");
                        inner.in_flight = false;
                        self.set_state(SessionState::Failed);
                        return Err(err);
                    }
                }
            }
        };

        self.set_state(SessionState::Bound);
        Ok(inner.held.insert(held))
    }

    async fn settle<R>(&self, inner: &mut Inner<C::Transport>, result: Result<R>) -> Result<R> {
        inner.in_flight = false;
        match result {
            Ok(value) if inner.mode == DiscoveryMode::CompanionBridge => {
                debug!("keeping bridge session warm");
                self.set_state(SessionState::Bound);
                Ok(value)
            }
            Ok(value) => {
                self.release(inner).await;
                self.set_state(SessionState::Released);
                Ok(value)
            }
            Err(err) => {
                warn!(%err, reason = err.reason(), "operation failed, releasing session");
                self.release(inner).await;
                self.set_state(SessionState::Failed);
                Err(err)
            }
        }
    }

    async fn open_direct(&self) -> Result<HeldSession<C::Transport>> {
        let transport = self.connector.open_local().await?;
        info!("opened local device");
        Ok(HeldSession::new(transport))
    }

    async fn open_companion(&self, url: &str) -> Result<HeldSession<C::Transport>> {
        self.discover_bridge(url).await?;

        let transport = self.connector.open_bridge(url).await?;
        info!(url, "opened bridge session");
        Ok(HeldSession::new(transport))
    }

    /// Probes the companion endpoint until it answers.
    async fn discover_bridge(&self, url: &str) -> Result<()> {
        let attempts = self.config.poll_attempts;
        let interval = self.config.poll_interval();

        for attempt in 1..=attempts {
            if self.cancel.is_cancelled() {
                info!(attempt, "bridge discovery cancelled");
                return Err(Error::Cancelled);
            }

            match self.connector.probe_bridge(url).await {
                Ok(()) => {
                    debug!(url, attempt, "bridge reachable");
                    return Ok(());
                }
                Err(err) => {
                    if attempt == 1 {
                        info!(uri = %self.config.companion_launch_uri, "launching companion");
                        self.connector
                            .launch_companion(&self.config.companion_launch_uri);
                    }
                    if attempt == attempts {
                        break;
                    }
                    debug!(url, attempt, attempts, %err, "bridge not reachable yet");
                }
            }

            if self.cancel.is_cancelled() {
                info!(attempt, "bridge discovery cancelled");
                return Err(Error::Cancelled);
            }
            self.connector.sleep(interval).await;
        }

        Err(Error::TransportDiscoveryTimeout { attempts })
    }

    fn set_state(&self, state: SessionState) {
        let previous = SessionState::from_u8(self.state.swap(state as u8, Ordering::SeqCst));
        if previous != state {
            debug!(from = ?previous, to = ?state, "session state");
        }
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;
    use std::cell::OnceCell;
    use std::rc::Rc;

    use futures::channel::oneshot;
    use futures::executor::block_on;
    use futures::future::{FutureExt, pending};

    use super::*;
    use crate::fields::SigningContext;
    use crate::transport::TransportError;
    use crate::transport::mock::MockConnector;

    const KEY: &[u8] = &[
        0x20, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
        0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
        0xAA, 0xAA, 0xAA, 0x90, 0x00,
    ];

    fn config(mode: DiscoveryMode, attempts: u32) -> BridgeConfig {
        BridgeConfig {
            poll_attempts: attempts,
            initial_mode: mode,
            ..BridgeConfig::default()
        }
    }

    fn manager(connector: MockConnector, mode: DiscoveryMode) -> SessionManager<MockConnector> {
        SessionManager::new(connector, config(mode, 5))
    }

    async fn public_key(manager: &SessionManager<MockConnector>) -> Result<[u8; 32]> {
        manager
            .with_session(async |app| app.get_public_key(0, false).await)
            .await
    }

    #[test]
    fn direct_mode_releases_after_success() {
        let manager = manager(MockConnector::new(), DiscoveryMode::Direct);
        manager.connector().script(&[KEY, KEY]);

        block_on(public_key(&manager)).unwrap();
        block_on(public_key(&manager)).unwrap();

        let journal = manager.connector().journal.borrow();
        assert_eq!(journal.opens, 2);
        assert_eq!(journal.closes, 2);
        assert_eq!(journal.probes, 0);
        assert_eq!(manager.state(), SessionState::Released);
    }

    #[test]
    fn direct_open_failure_is_reported_at_once() {
        let mut connector = MockConnector::new();
        connector.open_error = Some(TransportError::Locked);
        let manager = manager(connector, DiscoveryMode::Direct);

        let err = block_on(public_key(&manager)).unwrap_err();

        assert_eq!(err, Error::DeviceLocked);
        assert_eq!(manager.state(), SessionState::Failed);
        let journal = manager.connector().journal.borrow();
        assert_eq!(journal.closes, 0);
        assert!(journal.sleeps.is_empty());
    }

    #[test]
    fn failed_operation_releases_once() {
        let manager = manager(MockConnector::new(), DiscoveryMode::CompanionBridge);
        manager.connector().script(&[&[0x69, 0x85]]);

        let err = block_on(
            manager.with_session(async |app| app.sign_message(0, b"payload").await),
        )
        .unwrap_err();

        assert_eq!(err, Error::UserCancelled);
        assert_eq!(manager.state(), SessionState::Failed);
        assert_eq!(manager.connector().journal.borrow().closes, 1);
    }

    #[test]
    fn bridge_immediately_reachable() {
        let manager = manager(MockConnector::new(), DiscoveryMode::CompanionBridge);
        manager.connector().script(&[KEY]);

        let key = block_on(public_key(&manager)).unwrap();

        assert_eq!(key, [0xAA; 32]);
        let journal = manager.connector().journal.borrow();
        assert_eq!(journal.probes, 1);
        assert!(journal.launches.is_empty());
        assert!(journal.sleeps.is_empty());
        assert_eq!(journal.closes, 0);
        assert_eq!(manager.state(), SessionState::Bound);
    }

    #[test]
    fn bridge_launches_companion_once_and_polls() {
        let connector = MockConnector::new();
        connector.reachable_after.set(Some(3));
        let manager = manager(connector, DiscoveryMode::CompanionBridge);
        manager.connector().script(&[KEY]);

        block_on(public_key(&manager)).unwrap();

        let journal = manager.connector().journal.borrow();
        assert_eq!(journal.probes, 4);
        assert_eq!(journal.launches, vec!["ledgerlive://bridge?appName=Everscale"]);
        assert_eq!(journal.sleeps, vec![Duration::from_secs(1); 3]);
        assert_eq!(journal.opens, 1);
    }

    #[test]
    fn bridge_discovery_timeout() {
        let connector = MockConnector::new();
        connector.reachable_after.set(None);
        let manager = manager(connector, DiscoveryMode::CompanionBridge);

        let err = block_on(public_key(&manager)).unwrap_err();

        assert_eq!(err, Error::TransportDiscoveryTimeout { attempts: 5 });
        assert_eq!(manager.state(), SessionState::Failed);
        let journal = manager.connector().journal.borrow();
        assert_eq!(journal.probes, 5);
        assert_eq!(journal.sleeps.len(), 4);
        assert_eq!(journal.launches.len(), 1);
        assert_eq!(journal.opens, 0);
        assert!(journal.sent.is_empty());
    }

    #[test]
    fn cancel_stops_discovery_before_next_sleep() {
        let slot: Rc<OnceCell<CancelHandle>> = Rc::default();
        let hook_slot = Rc::clone(&slot);

        let mut connector = MockConnector::new();
        connector.reachable_after.set(None);
        connector.on_sleep = Some(Box::new(move |count: u32| {
            if count == 2
                && let Some(handle) = hook_slot.get()
            {
                handle.cancel();
            }
        }));
        let manager = SessionManager::new(connector, config(DiscoveryMode::CompanionBridge, 120));
        slot.set(manager.cancel_handle()).unwrap();

        let err = block_on(public_key(&manager)).unwrap_err();

        assert_eq!(err, Error::Cancelled);
        assert_eq!(err.reason(), "CANCELLED");
        let journal = manager.connector().journal.borrow();
        assert_eq!(journal.sleeps.len(), 2);
        assert_eq!(journal.probes, 2);
        assert_eq!(journal.opens, 0);
    }

    #[test]
    fn warm_session_is_reused() {
        let manager = manager(MockConnector::new(), DiscoveryMode::CompanionBridge);
        manager.connector().script(&[KEY, KEY]);

        block_on(public_key(&manager)).unwrap();
        block_on(public_key(&manager)).unwrap();

        let journal = manager.connector().journal.borrow();
        assert_eq!(journal.opens, 1);
        assert_eq!(journal.probes, 2);
        assert_eq!(journal.closes, 0);
    }

    #[test]
    fn warm_session_dropped_when_bridge_disappears() {
        let manager = manager(MockConnector::new(), DiscoveryMode::CompanionBridge);
        manager.connector().script(&[KEY]);
        block_on(public_key(&manager)).unwrap();

        manager.connector().reachable_after.set(None);
        let err = block_on(public_key(&manager)).unwrap_err();

        assert_eq!(err, Error::TransportDiscoveryTimeout { attempts: 5 });
        let journal = manager.connector().journal.borrow();
        assert_eq!(journal.closes, 1);
        assert_eq!(journal.probes, 1 + 1 + 5);
        assert_eq!(journal.opens, 1);
    }

    #[test]
    fn set_mode_releases_held_session() {
        let manager = manager(MockConnector::new(), DiscoveryMode::CompanionBridge);
        manager.connector().script(&[KEY, KEY]);
        block_on(public_key(&manager)).unwrap();
        assert_eq!(manager.state(), SessionState::Bound);

        block_on(manager.set_mode(DiscoveryMode::Direct));

        assert_eq!(manager.connector().journal.borrow().closes, 1);
        assert_eq!(manager.state(), SessionState::Released);
        assert_eq!(block_on(manager.mode()), DiscoveryMode::Direct);

        block_on(public_key(&manager)).unwrap();
        let journal = manager.connector().journal.borrow();
        assert_eq!(journal.opens, 2);
        assert_eq!(journal.closes, 2);
    }

    #[test]
    fn close_is_idempotent() {
        let manager = manager(MockConnector::new(), DiscoveryMode::CompanionBridge);
        manager.connector().script(&[KEY]);
        block_on(public_key(&manager)).unwrap();

        block_on(manager.close());
        block_on(manager.close());

        assert_eq!(manager.connector().journal.borrow().closes, 1);
    }

    #[test]
    fn version_read_once_per_held_session() {
        let manager = manager(MockConnector::new(), DiscoveryMode::CompanionBridge);
        manager.connector().script(&[
            &[1, 1, 0, 0x90, 0x00],
            &[0x40, 0x01, 0x90, 0x00],
            &[0x40, 0x02, 0x90, 0x00],
        ]);
        let ctx = SigningContext {
            decimals: 9,
            asset: "EVER".to_string(),
            ..SigningContext::default()
        };

        for _ in 0..2 {
            block_on(manager.with_signing_session(async |app, strategy| {
                assert_eq!(strategy, EncodingStrategy::Versioned);
                app.sign_transaction(0, &ctx, &[0x11; 16], strategy).await
            }))
            .unwrap();
        }

        let journal = manager.connector().journal.borrow();
        let configuration_reads = journal.sent.iter().filter(|a| a.ins() == 0x01).count();
        assert_eq!(configuration_reads, 1);
    }

    #[test]
    fn version_failure_releases_once() {
        let manager = manager(MockConnector::new(), DiscoveryMode::CompanionBridge);
        manager.connector().script(&[&[1, 1, 0x90, 0x00]]);

        let err = block_on(manager.with_signing_session(async |_, _| Ok(()))).unwrap_err();

        assert!(matches!(err, Error::MalformedResponse(_)));
        assert_eq!(manager.state(), SessionState::Failed);
        assert_eq!(manager.connector().journal.borrow().closes, 1);
    }

    #[test]
    fn sign_transaction_cancelled_on_second_frame() {
        let manager = manager(MockConnector::new(), DiscoveryMode::Direct);
        manager.connector().script(&[
            &[1, 0, 3, 0x90, 0x00],
            &[0x90, 0x00],
            &[0x69, 0x85],
            &[0x90, 0x00],
        ]);
        let ctx = SigningContext {
            decimals: 9,
            asset: "EVER".to_string(),
            ..SigningContext::default()
        };

        let err = block_on(manager.with_signing_session(async |app, strategy| {
            assert_eq!(strategy, EncodingStrategy::Legacy);
            app.sign_transaction(0, &ctx, &[0x22; 600], strategy).await
        }))
        .unwrap_err();

        assert_eq!(err, Error::UserCancelled);
        assert_eq!(err.reason(), "TRANSACTION_REJECTED");
        let journal = manager.connector().journal.borrow();
        let frames: Vec<u8> = journal
            .sent
            .iter()
            .filter(|a| a.ins() == 0x05)
            .map(|a| a.p2())
            .collect();
        assert_eq!(frames, vec![0x02, 0x03]);
        assert_eq!(journal.closes, 1);
    }

    #[test]
    fn abandoned_operation_is_released_by_next_operation() {
        let manager = manager(MockConnector::new(), DiscoveryMode::Direct);
        manager.connector().script(&[KEY]);

        let outcome = manager
            .with_session(async |_| pending::<Result<()>>().await)
            .now_or_never();
        assert!(outcome.is_none());
        assert_eq!(manager.connector().journal.borrow().closes, 0);

        block_on(public_key(&manager)).unwrap();

        let journal = manager.connector().journal.borrow();
        assert_eq!(journal.opens, 2);
        assert_eq!(journal.closes, 2);
        assert_eq!(manager.state(), SessionState::Released);
    }

    #[test]
    fn abandoned_warm_session_is_released_by_close() {
        let manager = manager(MockConnector::new(), DiscoveryMode::CompanionBridge);
        manager.connector().script(&[KEY]);
        block_on(public_key(&manager)).unwrap();

        let outcome = manager
            .with_session(async |_| pending::<Result<()>>().await)
            .now_or_never();
        assert!(outcome.is_none());

        block_on(manager.close());
        block_on(manager.close());

        let journal = manager.connector().journal.borrow();
        assert_eq!(journal.opens, 1);
        assert_eq!(journal.closes, 1);
        assert_eq!(manager.state(), SessionState::Released);
    }

    #[test]
    fn operations_run_one_at_a_time() {
        let manager = manager(MockConnector::new(), DiscoveryMode::Direct);
        manager.connector().script(&[KEY, KEY]);
        let (resume, parked) = oneshot::channel::<()>();

        let first = manager.with_session(async move |app| {
            let key = app.get_public_key(0, false).await;
            let _ = parked.await;
            key
        });
        let second = public_key(&manager);
        let observe = async {
            let journal = manager.connector().journal.borrow();
            let seen = (journal.opens, journal.sent.len(), journal.closes);
            drop(journal);
            let _ = resume.send(());
            seen
        };

        let (first, second, seen) = block_on(async { futures::join!(first, second, observe) });

        assert_eq!(seen, (1, 1, 0));
        assert_eq!(first.unwrap(), [0xAA; 32]);
        assert_eq!(second.unwrap(), [0xAA; 32]);
        let journal = manager.connector().journal.borrow();
        assert_eq!(journal.opens, 2);
        assert_eq!(journal.closes, 2);
    }

    #[test]
    fn zero_poll_attempts_still_probes_once() {
        let connector = MockConnector::new();
        connector.reachable_after.set(None);
        let manager = SessionManager::new(connector, config(DiscoveryMode::CompanionBridge, 0));

        let err = block_on(public_key(&manager)).unwrap_err();

        assert_eq!(err, Error::TransportDiscoveryTimeout { attempts: 1 });
        assert_eq!(manager.config().poll_attempts, 1);
        assert_eq!(manager.connector().journal.borrow().probes, 1);
    }
}
