//! Launch sequencing for the daemon.

use std::sync::Arc;

use chime_config::Config;
use ortho_config::OrthoError;
use tracing::{info, warn};

use crate::consumer::{Consumer, ConsumerSettings, StopReport};
use crate::handler::{ChatApi, MentionResponder};
use crate::monitor::{Monitor, TracingMonitor};
use crate::telemetry;
use crate::transport::{Acknowledger, EventTransport, SocketTransport, TransportError};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when any layer is invalid.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Collaborators produced by connecting to the event source.
pub struct Connection {
    /// Source of events for the consumer.
    pub transport: Arc<dyn EventTransport>,
    /// Envelope acknowledgements.
    pub acknowledger: Arc<dyn Acknowledger>,
    /// Outbound chat calls used by the responder.
    pub chat: Arc<dyn ChatApi>,
}

/// Opens the event source connection.
pub trait TransportConnector: Send + Sync {
    /// Connects using the resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the event source is unreachable.
    fn connect(&self, config: &Config) -> Result<Connection, TransportError>;
}

/// Connector backed by [`SocketTransport`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SocketConnector;

impl TransportConnector for SocketConnector {
    fn connect(&self, config: &Config) -> Result<Connection, TransportError> {
        let transport = Arc::new(SocketTransport::connect(
            &config.event_source(),
            config.app_token(),
        )?);
        let chat = Arc::new(transport.chat_api());
        Ok(Connection {
            transport: Arc::clone(&transport) as Arc<dyn EventTransport>,
            acknowledger: transport,
            chat,
        })
    }
}

/// Collaborators required to run the daemon.
pub(crate) struct LaunchPlan<L, C, S> {
    pub(crate) loader: L,
    pub(crate) connector: C,
    pub(crate) shutdown: S,
    pub(crate) monitor: Arc<dyn Monitor>,
}

/// Runs the daemon using the production collaborators.
///
/// # Errors
///
/// Returns a [`LaunchError`] when configuration, telemetry, the event source
/// connection, or signal handling fails.
pub fn run_daemon() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        loader: SystemConfigLoader,
        connector: SocketConnector,
        shutdown: SystemShutdownSignal,
        monitor: Arc::new(TracingMonitor),
    };
    run_daemon_with(plan).map(|_| ())
}

/// Runs the daemon with injected collaborators and returns the consumer's
/// stop report.
pub(crate) fn run_daemon_with<L, C, S>(plan: LaunchPlan<L, C, S>) -> Result<StopReport, LaunchError>
where
    L: ConfigLoader,
    C: TransportConnector,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        connector,
        shutdown,
        monitor,
    } = plan;

    let config = loader.load()?;
    let telemetry = telemetry::initialise(&config)?;
    let _daemon = telemetry::daemon_span(&config).entered();
    let settings = ConsumerSettings::from_config(&config);
    info!(
        target: PROCESS_TARGET,
        workers = settings.workers.get(),
        log_format = %telemetry.format(),
        "starting daemon runtime"
    );

    let Connection {
        transport,
        acknowledger,
        chat,
    } = connector.connect(&config)?;
    let handler = Arc::new(MentionResponder::new(acknowledger, chat));
    let consumer = Consumer::new(settings, transport, handler, monitor);
    consumer.start();

    let waited = shutdown.wait();
    if let Err(wait_error) = &waited {
        warn!(
            target: PROCESS_TARGET,
            error = %wait_error,
            "shutdown signal unavailable; stopping consumer"
        );
    }
    let report = consumer.stop();
    waited?;
    info!(
        target: PROCESS_TARGET,
        listeners = report.listeners,
        dropped_events = report.dropped_events,
        panicked = report.panicked,
        "shutdown sequence completed"
    );
    Ok(report)
}
