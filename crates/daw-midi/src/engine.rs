//! MIDI engine: owns the input connection and fans messages out to tracks
//!
//! The engine is a resource engine over [`MidiMessage`] with a bounded queue.
//! The worker blocks on the queue and notifies observers of every message;
//! the driver thread only ever calls `try_push` through [`MidiInputSink`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use daw_core::config::MidiConfig;
use daw_core::framework::{
    EngineResult, EngineSettings, EngineStatus, MessageProcessor, MessageQueue, Observer,
    ResourceEngine,
};
use daw_core::midi::MidiMessage;

use crate::backend::{MidiInputBackend, MidiInputConnectionHandle, MidiPortInfo, MidirBackend};
use crate::error::{MidiError, MidiResult};
use crate::input::MidiInputSink;

/// Worker-side handling before observers are notified
#[derive(Debug, Default)]
pub struct MidiProcessor {
    received: AtomicU64,
}

impl MidiProcessor {
    /// Messages dequeued by the worker since creation
    pub fn messages_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

impl MessageProcessor<MidiMessage> for MidiProcessor {
    fn process(&self, message: &MidiMessage) -> EngineResult<()> {
        self.received.fetch_add(1, Ordering::Relaxed);
        log::debug!("[MIDI IN] {}", message);
        Ok(())
    }
}

/// Owns the MIDI worker and the open input port
pub struct MidiEngine {
    engine: ResourceEngine<MidiMessage, MidiProcessor>,
    backend: Box<dyn MidiInputBackend>,
    connection: Mutex<Option<Box<dyn MidiInputConnectionHandle>>>,
}

impl MidiEngine {
    pub fn new(config: &MidiConfig) -> Self {
        Self::with_backend(
            Box::new(MidirBackend::new()),
            EngineSettings::blocking().with_queue_capacity(config.queue_capacity),
        )
    }

    pub fn with_backend(backend: Box<dyn MidiInputBackend>, settings: EngineSettings) -> Self {
        Self {
            engine: ResourceEngine::new("midi-engine", settings, MidiProcessor::default()),
            backend,
            connection: Mutex::new(None),
        }
    }

    pub fn start(&self) -> MidiResult<()> {
        self.engine.start()?;
        Ok(())
    }

    /// Stop the worker; messages already queued are still delivered
    pub fn stop(&self) {
        self.engine.stop();
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    pub fn status(&self) -> EngineStatus {
        self.engine.status()
    }

    pub fn get_ports(&self) -> MidiResult<Vec<MidiPortInfo>> {
        self.backend.ports()
    }

    /// Open input port `port_number`, closing any port already open
    pub fn open_input_port(&self, port_number: usize) -> MidiResult<()> {
        let available = self.backend.ports()?.len();
        if port_number >= available {
            return Err(MidiError::PortOutOfRange {
                port: port_number,
                available,
            });
        }

        let mut connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = connection.take() {
            log::info!("MIDI: closing '{}' before reconnecting", previous.port_name());
            previous.close();
        }

        let sink = MidiInputSink::new(self.engine.queue());
        let handle = self.backend.connect(port_number, sink)?;
        log::info!("MIDI: input port opened: {}", handle.port_name());
        *connection = Some(handle);
        Ok(())
    }

    /// Close the input port; no-op if none is open
    pub fn close_input_port(&self) {
        let handle = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let name = handle.port_name().to_string();
            handle.close();
            log::info!("MIDI: input port closed: {}", name);
        }
    }

    pub fn is_port_open(&self) -> bool {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn open_port_name(&self) -> Option<String> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.port_name().to_string())
    }

    pub fn attach<O: Observer<MidiMessage> + 'static>(&self, observer: &Arc<O>) -> bool {
        self.engine.attach(observer)
    }

    pub fn detach<O: Observer<MidiMessage> + 'static>(&self, observer: &Arc<O>) -> bool {
        self.engine.detach(observer)
    }

    /// Queue the driver callback feeds
    pub fn queue(&self) -> Arc<MessageQueue<MidiMessage>> {
        self.engine.queue()
    }

    pub fn messages_received(&self) -> u64 {
        self.engine.processor().messages_received()
    }
}

impl Drop for MidiEngine {
    fn drop(&mut self) {
        self.close_input_port();
        self.engine.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel;
    use daw_core::framework::ObserverError;
    use daw_core::midi::MidiMessageType;
    use daw_core::ErrorKind;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// In-memory backend; exposes the connected sink so tests can play the driver
    #[derive(Default)]
    struct FakeBackend {
        ports: Vec<String>,
        sink: Arc<Mutex<Option<MidiInputSink>>>,
        closed: Arc<AtomicUsize>,
        fail_connect: bool,
    }

    struct FakeConnection {
        name: String,
        closed: Arc<AtomicUsize>,
    }

    impl MidiInputConnectionHandle for FakeConnection {
        fn port_name(&self) -> &str {
            &self.name
        }

        fn close(self: Box<Self>) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl MidiInputBackend for FakeBackend {
        fn ports(&self) -> MidiResult<Vec<MidiPortInfo>> {
            Ok(self
                .ports
                .iter()
                .enumerate()
                .map(|(port_number, name)| MidiPortInfo {
                    port_number,
                    port_name: name.clone(),
                })
                .collect())
        }

        fn connect(
            &self,
            port: usize,
            sink: MidiInputSink,
        ) -> MidiResult<Box<dyn MidiInputConnectionHandle>> {
            if self.fail_connect {
                return Err(MidiError::driver("open input port", "device busy"));
            }
            *self.sink.lock().unwrap() = Some(sink);
            Ok(Box::new(FakeConnection {
                name: self.ports[port].clone(),
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    struct Forward(channel::Sender<MidiMessage>);

    impl Observer<MidiMessage> for Forward {
        fn update(&self, message: &MidiMessage) -> Result<(), ObserverError> {
            let _ = self.0.send(*message);
            Ok(())
        }
    }

    fn fake(ports: &[&str]) -> FakeBackend {
        FakeBackend {
            ports: ports.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    fn engine_with(backend: FakeBackend) -> MidiEngine {
        MidiEngine::with_backend(
            Box::new(backend),
            EngineSettings::blocking().with_queue_capacity(64),
        )
    }

    #[test]
    fn test_driver_bytes_reach_observers() {
        let backend = fake(&["Keyboard"]);
        let sink = Arc::clone(&backend.sink);
        let engine = engine_with(backend);
        let (tx, rx) = channel::unbounded();
        let observer = Arc::new(Forward(tx));
        engine.attach(&observer);
        engine.start().unwrap();

        engine.open_input_port(0).unwrap();
        assert_eq!(engine.open_port_name().as_deref(), Some("Keyboard"));

        {
            let mut guard = sink.lock().unwrap();
            let sink = guard.as_mut().unwrap();
            sink.receive(0, &[0x90, 60, 100]);
            sink.receive(500, &[0xB0, 1, 64]);
        }

        let wait = Duration::from_secs(2);
        let first = rx.recv_timeout(wait).unwrap();
        let second = rx.recv_timeout(wait).unwrap();
        assert_eq!(first.message_type, MidiMessageType::NoteOn);
        assert_eq!(second.message_type, MidiMessageType::ControlChange);
        assert!((second.delta_time - 0.0005).abs() < 1e-9);

        engine.stop();
        assert_eq!(engine.messages_received(), 2);
    }

    #[test]
    fn test_open_port_out_of_range() {
        let engine = engine_with(fake(&["A", "B"]));

        let err = engine.open_input_port(2).unwrap_err();
        assert!(matches!(
            err,
            MidiError::PortOutOfRange {
                port: 2,
                available: 2
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!engine.is_port_open());
    }

    #[test]
    fn test_connect_failure_is_driver_error() {
        let mut backend = fake(&["A"]);
        backend.fail_connect = true;
        let engine = engine_with(backend);

        let err = engine.open_input_port(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Driver);
        assert!(!engine.is_port_open());
    }

    #[test]
    fn test_reopen_closes_previous_port() {
        let backend = fake(&["A", "B"]);
        let closed = Arc::clone(&backend.closed);
        let engine = engine_with(backend);

        engine.open_input_port(0).unwrap();
        engine.open_input_port(1).unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert_eq!(engine.open_port_name().as_deref(), Some("B"));

        engine.close_input_port();
        engine.close_input_port();
        assert_eq!(closed.load(Ordering::SeqCst), 2);
        assert!(!engine.is_port_open());
    }

    #[test]
    fn test_drop_closes_port() {
        let backend = fake(&["A"]);
        let closed = Arc::clone(&backend.closed);
        let engine = engine_with(backend);
        engine.start().unwrap();
        engine.open_input_port(0).unwrap();

        drop(engine);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
