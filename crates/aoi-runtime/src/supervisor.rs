//! Session lifecycle: configuration check, connect loop, pre-flight gate,
//! event service and shutdown.
//!
//! # Lifecycle
//!
//! ```text
//! Unconfigured ──(secrets ok)──► Connecting(0) ──fail──► sleep 2u ──► Connecting(1) ... Connecting(5)
//!      │                              │                                                   │
//!      │ missing keys                 │ authenticated                          6th failure│ sleep 64u
//!      ▼                              ▼                                                   ▼
//! FatallyFailed                  Validating ──(catalog ok)──► Connected ──► Stopped   FatallyFailed
//!                                     │
//!                                     └──(undocumented commands)──► FatallyFailed
//! ```
//!
//! Fatal outcomes are logged and reported through [`SessionState`]; nothing
//! panics and the process can exit normally.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use aoi_runtime::SessionSupervisor;
//!
//! let supervisor = SessionSupervisor::builder()
//!     .gateway(gateway)
//!     .catalog(registry)
//!     .build()?;
//!
//! // Serves events until the gateway stops or Ctrl+C / SIGTERM.
//! let state = supervisor.run().await;
//! ```

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use aoi_core::{BoxedGateway, CommandCatalog, Credentials, GatewayError};
use aoi_framework::{BotState, CommandRegistry};
use tokio::signal;
use tokio::sync::watch;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::{AoiConfig, ConfigLoader, LoggingConfig, Secrets, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::preflight::validate_catalog;

/// Number of handshake attempts before giving up.
pub const MAX_CONNECT_ATTEMPTS: u32 = 6;

/// Delay after the failed attempt `attempt` (zero-based): `2^(attempt+1)` units.
pub fn backoff_delay(attempt: u32, unit: Duration) -> Duration {
    unit.saturating_mul(2u32.saturating_pow(attempt + 1))
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Configuration not yet checked.
    Unconfigured,
    /// Handshake attempt in progress (zero-based).
    Connecting(u32),
    /// Authenticated; the command catalog is being checked.
    Validating,
    /// Serving events.
    Connected,
    /// Event service ended normally or on a shutdown signal.
    Stopped,
    /// Startup or the session ended with an unrecoverable error.
    FatallyFailed(String),
}

impl SessionState {
    /// Returns `true` for [`SessionState::FatallyFailed`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatallyFailed(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => f.write_str("unconfigured"),
            Self::Connecting(attempt) => write!(f, "connecting (attempt {})", attempt + 1),
            Self::Validating => f.write_str("validating"),
            Self::Connected => f.write_str("connected"),
            Self::Stopped => f.write_str("stopped"),
            Self::FatallyFailed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Drives one bot session from configuration to shutdown.
pub struct SessionSupervisor {
    config: AoiConfig,
    gateway: BoxedGateway,
    catalog: Arc<dyn CommandCatalog>,
    state: BotState,
    session: watch::Sender<SessionState>,
    secrets: OnceLock<Secrets>,
    started: AtomicBool,
}

impl SessionSupervisor {
    /// Creates a builder.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &AoiConfig {
        &self.config
    }

    /// Returns the shared bot state.
    pub fn bot_state(&self) -> &BotState {
        &self.state
    }

    /// Returns the current session state.
    pub fn state(&self) -> SessionState {
        self.session.borrow().clone()
    }

    /// Subscribes to session state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Returns the secrets checked by a successful [`start`](Self::start).
    pub fn secrets(&self) -> Option<&Secrets> {
        self.secrets.get()
    }

    fn transition(&self, next: SessionState) {
        let previous = self.session.send_replace(next.clone());
        if previous != next {
            info!(from = %previous, to = %next, "Session state changed");
        }
    }

    fn fail(&self, err: &RuntimeError) {
        match err {
            RuntimeError::Config(e) => error!(error = %e, "Configuration check failed, not starting"),
            RuntimeError::Validation(e) => error!(
                violations = e.violations.len(),
                "Command catalog validation failed, not starting"
            ),
            RuntimeError::ConnectAttemptsExhausted {
                attempts,
                last_error,
            } => error!(
                attempts,
                error = %last_error,
                "Could not connect to the gateway, giving up"
            ),
            RuntimeError::Gateway(e) => error!(error = %e, "Gateway failed"),
            RuntimeError::MissingGateway => error!("No gateway configured"),
            RuntimeError::AlreadyStarted => error!("Session already started"),
        }
        self.transition(SessionState::FatallyFailed(err.to_string()));
    }

    /// Checks configuration, connects with backoff and validates the command
    /// catalog. On success the state is [`SessionState::Connected`].
    ///
    /// Failures are logged and leave the state at
    /// [`SessionState::FatallyFailed`].
    ///
    /// A session starts once. Later calls return
    /// [`RuntimeError::AlreadyStarted`] and leave the state untouched.
    pub async fn start(&self) -> RuntimeResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!(state = %self.state(), "Session already started");
            return Err(RuntimeError::AlreadyStarted);
        }

        match self.establish().await {
            Ok(secrets) => {
                // Only the first start gets here.
                let _ = self.secrets.set(secrets);
                self.transition(SessionState::Connected);
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    async fn establish(&self) -> RuntimeResult<Secrets> {
        self.transition(SessionState::Unconfigured);

        validate_config(&self.config)?;
        let secrets = self.config.credentials.resolve()?;

        let unavailable = self.config.credentials.missing_optional();
        if !unavailable.is_empty() {
            warn!(
                keys = ?unavailable,
                "Optional API keys not set, dependent commands will not work"
            );
        }

        self.connect_with_backoff(&secrets.credentials).await?;

        self.transition(SessionState::Validating);
        validate_catalog(self.catalog.as_ref())?;

        Ok(secrets)
    }

    async fn connect_with_backoff(&self, credentials: &Credentials) -> RuntimeResult<()> {
        let unit = self.config.connection.backoff_unit();
        let mut last_error = GatewayError::connection_failed("no attempt made");

        for attempt in 0..MAX_CONNECT_ATTEMPTS {
            self.transition(SessionState::Connecting(attempt));

            let span = info_span!("connect", gateway = self.gateway.name(), attempt);
            match self.gateway.authenticate(credentials).instrument(span).await {
                Ok(()) => {
                    info!(attempt, "Authenticated with the gateway");
                    return Ok(());
                }
                Err(e) if !e.is_transient() => return Err(e.into()),
                Err(e) => {
                    let delay = backoff_delay(attempt, unit);
                    warn!(
                        attempt,
                        remaining = MAX_CONNECT_ATTEMPTS - attempt - 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Connection attempt failed"
                    );
                    tokio::time::sleep(delay).await;
                    last_error = e;
                }
            }
        }

        Err(RuntimeError::ConnectAttemptsExhausted {
            attempts: MAX_CONNECT_ATTEMPTS,
            last_error,
        })
    }

    /// Starts the session and serves events until the gateway loop returns
    /// or `shutdown` completes, then cancels outstanding background tasks.
    ///
    /// Returns the final state.
    pub async fn run_until<F>(&self, shutdown: F) -> SessionState
    where
        F: Future<Output = ()>,
    {
        if self.start().await.is_err() {
            return self.state();
        }

        info!(gateway = self.gateway.name(), "Serving events");

        let outcome = tokio::select! {
            result = self.gateway.serve_events() => result,
            _ = shutdown => {
                info!("Shutdown requested");
                Ok(())
            }
        };

        let pending = self.state.tasks().len();
        if pending > 0 {
            info!(pending, "Cancelling background tasks");
        }
        self.state.tasks().cancel_all();

        match outcome {
            Ok(()) => self.transition(SessionState::Stopped),
            Err(e) => self.fail(&RuntimeError::Gateway(e)),
        }

        self.state()
    }

    /// Runs until the gateway loop returns or Ctrl+C / SIGTERM arrives.
    pub async fn run(&self) -> SessionState {
        self.run_until(wait_for_shutdown()).await
    }
}

impl fmt::Debug for SessionSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSupervisor")
            .field("gateway", &self.gateway.name())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// SupervisorBuilder
// =============================================================================

/// Builder for [`SessionSupervisor`].
pub struct SupervisorBuilder {
    config_loader: ConfigLoader,
    config: Option<AoiConfig>,
    gateway: Option<BoxedGateway>,
    catalog: Option<Arc<dyn CommandCatalog>>,
    state: Option<BotState>,
    init_logging: bool,
}

impl SupervisorBuilder {
    /// Creates a builder that loads configuration from the default sources.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            config: None,
            gateway: None,
            catalog: None,
            state: None,
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a directory to search for `aoi.toml`.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges programmatic base configuration.
    pub fn merge(mut self, config: AoiConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses `config` as is, skipping every configuration source.
    pub fn config(mut self, config: AoiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the gateway. Required.
    pub fn gateway(mut self, gateway: BoxedGateway) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Sets the command catalog checked before serving events.
    ///
    /// Defaults to an empty [`CommandRegistry`].
    pub fn catalog(mut self, catalog: Arc<dyn CommandCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Shares existing bot state with the supervisor.
    pub fn state(mut self, state: BotState) -> Self {
        self.state = Some(state);
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn skip_logging_init(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads configuration, initializes logging and builds the supervisor.
    pub fn build(self) -> RuntimeResult<SessionSupervisor> {
        let config = match self.config {
            Some(config) => config,
            None => match self.config_loader.load() {
                Ok(config) => config,
                Err(e) => {
                    if self.init_logging {
                        logging::init_from_config(&LoggingConfig::default());
                    }
                    error!(error = %e, "Configuration could not be loaded, not starting");
                    return Err(e.into());
                }
            },
        };

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let gateway = self.gateway.ok_or(RuntimeError::MissingGateway)?;
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(CommandRegistry::new()));

        debug!(
            gateway = gateway.name(),
            backoff_unit_ms = config.connection.backoff_unit_ms,
            "Session supervisor created"
        );

        let (session, _) = watch::channel(SessionState::Unconfigured);

        Ok(SessionSupervisor {
            config,
            gateway,
            catalog,
            state: self.state.unwrap_or_default(),
            session,
            secrets: OnceLock::new(),
            started: AtomicBool::new(false),
        })
    }
}

impl Default for SupervisorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
