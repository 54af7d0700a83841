//! Behavioural tests covering daemon launch, signal handling, and shutdown.

use std::cell::RefCell;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use chime_config::{Config, SocketEndpoint};
use ortho_config::OrthoError;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};

use crate::consumer::StopReport;
use crate::monitor::Monitor;
use crate::process::launch::{LaunchPlan, SocketConnector, run_daemon_with};
use crate::process::{ConfigLoader, LaunchError};
use crate::tests::support::{RecordingMonitor, TestShutdownSignal, WAIT_TIMEOUT};

type StepResult = Result<(), String>;
type LaunchResult = Result<StopReport, LaunchError>;

#[derive(Clone)]
enum TestConfigLoader {
    Endpoint { endpoint: SocketEndpoint, workers: i64 },
    Rejecting,
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        match self {
            Self::Endpoint { endpoint, workers } => Ok(Config {
                event_source: endpoint.clone(),
                workers: *workers,
                log_filter: String::from("warn"),
                ..Config::default()
            }),
            Self::Rejecting => Config::load_from_iter([
                OsString::from("chimed"),
                OsString::from("--event-source"),
                OsString::from("ftp://events.invalid/feed"),
            ]),
        }
    }
}

struct ProcessWorld {
    listener: Option<TcpListener>,
    loader: TestConfigLoader,
    shutdown: TestShutdownSignal,
    handle: Option<thread::JoinHandle<LaunchResult>>,
    peer: Option<TcpStream>,
    inbound: Option<BufReader<TcpStream>>,
    result: Option<LaunchResult>,
}

impl ProcessWorld {
    fn new() -> Self {
        Self {
            listener: None,
            loader: TestConfigLoader::Rejecting,
            shutdown: TestShutdownSignal::new(),
            handle: None,
            peer: None,
            inbound: None,
            result: None,
        }
    }

    fn plan(&self) -> LaunchPlan<TestConfigLoader, SocketConnector, TestShutdownSignal> {
        LaunchPlan {
            loader: self.loader.clone(),
            connector: SocketConnector,
            shutdown: self.shutdown.clone(),
            monitor: Arc::new(RecordingMonitor::default()) as Arc<dyn Monitor>,
        }
    }

    fn read_frame(&mut self) -> Result<Value, String> {
        let inbound = self
            .inbound
            .as_mut()
            .ok_or_else(|| String::from("event source not connected"))?;
        let mut line = String::new();
        inbound
            .read_line(&mut line)
            .map_err(|error| format!("failed to read frame: {error}"))?;
        serde_json::from_str(&line).map_err(|error| format!("invalid frame {line:?}: {error}"))
    }

    fn take_result(&self) -> Result<&LaunchResult, String> {
        self.result
            .as_ref()
            .ok_or_else(|| String::from("daemon has not completed"))
    }
}

#[fixture]
fn world() -> RefCell<ProcessWorld> {
    RefCell::new(ProcessWorld::new())
}

fn bind_local() -> Result<(TcpListener, SocketEndpoint), String> {
    let listener =
        TcpListener::bind("127.0.0.1:0").map_err(|error| format!("bind failed: {error}"))?;
    let port = listener
        .local_addr()
        .map_err(|error| format!("no local address: {error}"))?
        .port();
    Ok((listener, SocketEndpoint::tcp("127.0.0.1", port)))
}

#[given("an event source accepting connections")]
fn given_event_source(world: &RefCell<ProcessWorld>) -> StepResult {
    let (listener, endpoint) = bind_local()?;
    let mut state = world.borrow_mut();
    state.listener = Some(listener);
    state.loader = TestConfigLoader::Endpoint {
        endpoint,
        workers: 1,
    };
    Ok(())
}

#[given("an event source that refuses connections")]
fn given_refusing_source(world: &RefCell<ProcessWorld>) -> StepResult {
    let (listener, endpoint) = bind_local()?;
    drop(listener);
    world.borrow_mut().loader = TestConfigLoader::Endpoint {
        endpoint,
        workers: 1,
    };
    Ok(())
}

#[given("a configuration loader that rejects its input")]
fn given_rejecting_loader(world: &RefCell<ProcessWorld>) {
    world.borrow_mut().loader = TestConfigLoader::Rejecting;
}

#[given("the daemon is configured with {workers} workers")]
fn given_workers(world: &RefCell<ProcessWorld>, workers: i64) -> StepResult {
    let mut state = world.borrow_mut();
    match &mut state.loader {
        TestConfigLoader::Endpoint { workers: count, .. } => {
            *count = workers;
            Ok(())
        }
        TestConfigLoader::Rejecting => Err(String::from("no event source configured")),
    }
}

#[when("the daemon starts")]
fn when_daemon_starts(world: &RefCell<ProcessWorld>) -> StepResult {
    let mut state = world.borrow_mut();
    let plan = state.plan();
    state.handle = Some(thread::spawn(move || run_daemon_with(plan)));

    let listener = state
        .listener
        .take()
        .ok_or_else(|| String::from("no event source listening"))?;
    let (peer, _) = listener
        .accept()
        .map_err(|error| format!("daemon never connected: {error}"))?;
    peer.set_read_timeout(Some(WAIT_TIMEOUT))
        .map_err(|error| error.to_string())?;
    let inbound = peer.try_clone().map_err(|error| error.to_string())?;
    state.inbound = Some(BufReader::new(inbound));
    state.peer = Some(peer);
    Ok(())
}

#[when("the event source sends a mention saying {text} with envelope {envelope}")]
fn when_mention_sent(world: &RefCell<ProcessWorld>, text: String, envelope: String) -> StepResult {
    let frame = json!({
        "envelope_id": envelope.trim_matches('"'),
        "type": "events_api",
        "payload": {
            "type": "event_callback",
            "team_id": "T1",
            "event": {
                "type": "app_mention",
                "user": "U42",
                "text": text.trim_matches('"'),
                "channel": "C7",
                "ts": "1700000000.000100"
            }
        }
    });
    let mut state = world.borrow_mut();
    let peer = state
        .peer
        .as_mut()
        .ok_or_else(|| String::from("event source not connected"))?;
    writeln!(peer, "{frame}").map_err(|error| format!("failed to send mention: {error}"))
}

#[when("shutdown is triggered")]
fn when_shutdown_triggered(world: &RefCell<ProcessWorld>) {
    world.borrow().shutdown.trigger();
}

#[when("the daemon run completes")]
fn when_daemon_completes(world: &RefCell<ProcessWorld>) -> StepResult {
    let mut state = world.borrow_mut();
    let handle = state
        .handle
        .take()
        .ok_or_else(|| String::from("daemon not running"))?;
    let result = handle
        .join()
        .map_err(|_| String::from("daemon thread panicked"))?;
    state.result = Some(result);
    Ok(())
}

#[when("the daemon runs to completion")]
fn when_daemon_runs(world: &RefCell<ProcessWorld>) {
    let plan = world.borrow().plan();
    world.borrow().shutdown.trigger();
    let result = run_daemon_with(plan);
    world.borrow_mut().result = Some(result);
}

#[then("the event source receives an acknowledgement for {envelope}")]
fn then_ack_received(world: &RefCell<ProcessWorld>, envelope: String) -> StepResult {
    let frame = world.borrow_mut().read_frame()?;
    assert_eq!(frame, json!({"envelope_id": envelope.trim_matches('"')}));
    Ok(())
}

#[then("the event source receives a reply with text {text}")]
fn then_reply_received(world: &RefCell<ProcessWorld>, text: String) -> StepResult {
    let frame = world.borrow_mut().read_frame()?;
    assert_eq!(frame.get("type"), Some(&json!("chat.postMessage")));
    assert_eq!(frame.get("channel"), Some(&json!("C7")));
    let reply = frame
        .pointer("/attachments/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("reply without attachment text: {frame}"))?;
    assert_eq!(reply, text.trim_matches('"'));
    Ok(())
}

#[then("the daemon exited cleanly with {count} listeners joined")]
fn then_clean_exit(world: &RefCell<ProcessWorld>, count: usize) -> StepResult {
    let state = world.borrow();
    match state.take_result()? {
        Ok(report) => {
            assert_eq!(report.listeners, count);
            assert_eq!(report.panicked, 0);
            Ok(())
        }
        Err(error) => Err(format!("daemon failed: {error}")),
    }
}

#[then("the launch failed to connect the transport")]
fn then_transport_failure(world: &RefCell<ProcessWorld>) -> StepResult {
    let state = world.borrow();
    let result = state.take_result()?;
    assert!(
        matches!(result, Err(LaunchError::Transport { .. })),
        "expected transport failure, got {result:?}"
    );
    Ok(())
}

#[then("the launch failed to load configuration")]
fn then_config_failure(world: &RefCell<ProcessWorld>) -> StepResult {
    let state = world.borrow();
    let result = state.take_result()?;
    assert!(
        matches!(result, Err(LaunchError::Config { .. })),
        "expected configuration failure, got {result:?}"
    );
    Ok(())
}

#[scenario(path = "tests/features/daemon_process.feature")]
fn daemon_process(#[from(world)] world: RefCell<ProcessWorld>) {
    let _ = world;
}
