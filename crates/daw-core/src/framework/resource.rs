//! Resource engine: a threaded engine that is also a subject
//!
//! Every dequeued message is first handed to the component's
//! [`MessageProcessor`], then fanned out to attached observers. A processing
//! error aborts that message only: it is logged, observers are not notified,
//! and the worker moves on to the next message.

use std::sync::Arc;

use super::engine::{EngineHandler, EngineResult, EngineSettings, EngineStatus, ThreadedEngine};
use super::observer::{Observer, Subject};
use super::queue::{MessageQueue, QueueError};

/// Component-specific handling run on the worker before notification
pub trait MessageProcessor<T>: Send + Sync + 'static {
    fn on_start(&self) {}

    fn process(&self, message: &T) -> EngineResult<()>;

    fn tick(&self) {}

    fn on_stop(&self) {}
}

/// Glue between a processor and the subject, run by the worker thread
struct ResourceHandler<T, P> {
    processor: Arc<P>,
    subject: Arc<Subject<T>>,
}

impl<T, P> EngineHandler<T> for ResourceHandler<T, P>
where
    T: Send + Sync + 'static,
    P: MessageProcessor<T>,
{
    fn on_start(&self) {
        self.processor.on_start();
    }

    fn handle_message(&self, message: T) -> EngineResult<()> {
        self.processor.process(&message)?;
        self.subject.notify(&message);
        Ok(())
    }

    fn tick(&self) {
        self.processor.tick();
    }

    fn on_stop(&self) {
        self.processor.on_stop();
    }
}

/// Threaded engine that notifies observers of every processed message
pub struct ResourceEngine<T: Send + Sync + 'static, P: MessageProcessor<T>> {
    engine: ThreadedEngine<T>,
    subject: Arc<Subject<T>>,
    processor: Arc<P>,
}

impl<T, P> ResourceEngine<T, P>
where
    T: Send + Sync + 'static,
    P: MessageProcessor<T>,
{
    pub fn new(name: impl Into<String>, settings: EngineSettings, processor: P) -> Self {
        Self {
            engine: ThreadedEngine::new(name, settings),
            subject: Arc::new(Subject::new()),
            processor: Arc::new(processor),
        }
    }

    pub fn start(&self) -> EngineResult<()> {
        self.engine.start(Arc::new(ResourceHandler {
            processor: Arc::clone(&self.processor),
            subject: Arc::clone(&self.subject),
        }))
    }

    pub fn stop(&self) {
        self.engine.stop();
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    pub fn status(&self) -> EngineStatus {
        self.engine.status()
    }

    pub fn name(&self) -> &str {
        self.engine.name()
    }

    pub fn push(&self, message: T) -> Result<(), QueueError<T>> {
        self.engine.push(message)
    }

    pub fn try_push(&self, message: T) -> Result<(), QueueError<T>> {
        self.engine.try_push(message)
    }

    pub fn queue(&self) -> Arc<MessageQueue<T>> {
        self.engine.queue()
    }

    pub fn attach<O: Observer<T> + 'static>(&self, observer: &Arc<O>) -> bool {
        self.subject.attach(observer)
    }

    pub fn detach<O: Observer<T> + 'static>(&self, observer: &Arc<O>) -> bool {
        self.subject.detach(observer)
    }

    pub fn subject(&self) -> &Arc<Subject<T>> {
        &self.subject
    }

    pub fn processor(&self) -> &Arc<P> {
        &self.processor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::engine::EngineError;
    use crate::framework::observer::ObserverError;
    use crossbeam::channel;
    use std::time::Duration;

    struct RejectOdd;

    impl MessageProcessor<u32> for RejectOdd {
        fn process(&self, message: &u32) -> EngineResult<()> {
            if message % 2 == 1 {
                return Err(EngineError::Logic(format!("unsupported command {}", message)));
            }
            Ok(())
        }
    }

    struct Sink(channel::Sender<u32>);

    impl Observer<u32> for Sink {
        fn update(&self, message: &u32) -> Result<(), ObserverError> {
            let _ = self.0.send(*message);
            Ok(())
        }
    }

    #[test]
    fn test_processed_messages_fan_out_to_observers() {
        let engine = ResourceEngine::new("resource-test", EngineSettings::blocking(), RejectOdd);
        let (tx_a, rx_a) = channel::unbounded();
        let (tx_b, rx_b) = channel::unbounded();
        let a = Arc::new(Sink(tx_a));
        let b = Arc::new(Sink(tx_b));
        engine.attach(&a);
        engine.attach(&b);

        engine.start().unwrap();
        engine.push(2).unwrap();

        let wait = Duration::from_secs(2);
        assert_eq!(rx_a.recv_timeout(wait).unwrap(), 2);
        assert_eq!(rx_b.recv_timeout(wait).unwrap(), 2);
        engine.stop();
    }

    #[test]
    fn test_processing_error_skips_only_that_message() {
        let engine = ResourceEngine::new("resource-error", EngineSettings::blocking(), RejectOdd);
        let (tx, rx) = channel::unbounded();
        let sink = Arc::new(Sink(tx));
        engine.attach(&sink);
        engine.start().unwrap();

        engine.push(1).unwrap();
        engine.push(4).unwrap();
        engine.stop();

        let received: Vec<u32> = rx.try_iter().collect();
        assert_eq!(received, vec![4]);
    }
}
