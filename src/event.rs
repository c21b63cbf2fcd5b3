// MIT License - Copyright (c) 2026 Peter Wright
// Transition sinks

use tokio::sync::broadcast;
use tracing::info;

use crate::catalog::PointDetails;
use crate::diff::{Transition, TransitionKind};

/// Receives every detected transition, in detection order.
pub trait TransitionSink {
    fn emit(&mut self, transition: &Transition, details: Option<&PointDetails>);
}

/// Writes one log line per transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TransitionSink for LogSink {
    fn emit(&mut self, transition: &Transition, details: Option<&PointDetails>) {
        let description = details
            .map(|d| d.description.as_str())
            .unwrap_or("No description");

        match (&transition.previous, &transition.current) {
            (None, Some(current)) => info!(
                "New point: {} - {} ({})",
                current.point_id, current.status_code, description
            ),
            (Some(previous), Some(current)) => info!(
                "Status changed: {} from {} to {} ({})",
                current.point_id, previous.status_code, current.status_code, description
            ),
            (Some(previous), None) => {
                info!("Point cleared: {} ({})", previous.point_id, description)
            }
            (None, None) => {}
        }
    }
}

/// Collects transitions in memory.
impl TransitionSink for Vec<Transition> {
    fn emit(&mut self, transition: &Transition, _details: Option<&PointDetails>) {
        self.push(transition.clone());
    }
}

/// A transition together with whatever the directory knew about its point.
#[derive(Debug, Clone)]
pub struct TransitionEvent {
    pub transition: Transition,
    pub details: Option<PointDetails>,
}

impl TransitionEvent {
    pub fn kind(&self) -> TransitionKind {
        self.transition.kind
    }
}

/// Type alias for the broadcast sender.
pub type EventSender = broadcast::Sender<TransitionEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = broadcast::Receiver<TransitionEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    broadcast::channel(capacity)
}

/// Fans transitions out to any number of subscribers. Events sent while
/// nobody is subscribed are dropped.
impl TransitionSink for EventSender {
    fn emit(&mut self, transition: &Transition, details: Option<&PointDetails>) {
        let _ = self.send(TransitionEvent {
            transition: transition.clone(),
            details: details.cloned(),
        });
    }
}

/// Sends each transition to both sinks, left first.
impl<A: TransitionSink, B: TransitionSink> TransitionSink for (A, B) {
    fn emit(&mut self, transition: &Transition, details: Option<&PointDetails>) {
        self.0.emit(transition, details);
        self.1.emit(transition, details);
    }
}
