use model::events::{Event, ingest::IngestEvent};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Receives the structured events of one run.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: IngestEvent);
}

/// Forwards events to `tracing`; errors at `warn`, batches at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: IngestEvent) {
        let event_type = Event::event_type(&event);
        let run_id = event.run_id();
        let entity = event.entity().unwrap_or("-");

        if event.is_error() {
            warn!(event_type, run_id, entity, "{event}");
        } else if matches!(event, IngestEvent::BatchCommitted { .. }) {
            debug!(event_type, run_id, entity, "{event}");
        } else {
            info!(event_type, run_id, entity, "{event}");
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<IngestEvent>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<IngestEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.event_type()).collect()
    }
}

impl EventSink for CollectingSink {
    fn publish(&self, event: IngestEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Hands events to a subscriber over a bounded channel without blocking the run.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<Arc<IngestEvent>>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<Arc<IngestEvent>>) -> Self {
        ChannelSink { sender }
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: IngestEvent) {
        // try_send is non-blocking; a full or closed channel drops the event.
        if let Err(e) = self.sender.try_send(Arc::new(event)) {
            warn!(error = %e, "Dropped ingest event for slow subscriber");
        }
    }
}

/// Publishes to several sinks in order.
impl EventSink for Vec<Arc<dyn EventSink>> {
    fn publish(&self, event: IngestEvent) {
        if let Some((last, rest)) = self.split_last() {
            for sink in rest {
                sink.publish(event.clone());
            }
            last.publish(event);
        } else {
            debug!("No event sinks registered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tracing_test::traced_test;

    fn started(entity: &str) -> IngestEvent {
        IngestEvent::EntityStarted {
            run_id: "run-1".into(),
            entity: entity.into(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        sink.publish(started("Department"));
        sink.publish(started("Job"));
        let entities: Vec<_> = sink
            .events()
            .iter()
            .filter_map(|e| e.entity().map(str::to_string))
            .collect();
        assert_eq!(entities, vec!["Department", "Job"]);
    }

    #[traced_test]
    #[test]
    fn tracing_sink_logs_events() {
        TracingSink.publish(started("Employee"));
        assert!(logs_contain("Employee: started"));
    }

    #[tokio::test]
    async fn channel_sink_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let sink = ChannelSink::new(tx);
        sink.publish(started("Department"));
        sink.publish(started("Job"));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.entity(), Some("Department"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn fan_out_reaches_every_sink() {
        let a = CollectingSink::new();
        let b = CollectingSink::new();
        let sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(a.clone()), Arc::new(b.clone())];
        sinks.publish(started("Job"));
        assert_eq!(a.events().len(), 1);
        assert_eq!(b.events().len(), 1);
    }
}
