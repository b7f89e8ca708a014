//! Components that run on, or feed events into, the single coordination
//! context.
//!
//! Every message carries the [`tracing::Span`] that was current when it was
//! sent, so work done on the receiving side is attributed to its cause.

pub mod drag_tracker;
pub mod reactor;
pub mod window_observer;

use tokio::sync::mpsc;

pub struct Sender<Event>(mpsc::UnboundedSender<(tracing::Span, Event)>);

pub type Receiver<Event> = mpsc::UnboundedReceiver<(tracing::Span, Event)>;

pub fn channel<Event>() -> (Sender<Event>, Receiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Sender(tx), rx)
}

impl<Event> Sender<Event> {
    /// Sends an event, dropping it silently if the receiver has shut down.
    pub fn send(&self, event: Event) { _ = self.try_send(event); }

    pub fn try_send(
        &self,
        event: Event,
    ) -> Result<(), mpsc::error::SendError<(tracing::Span, Event)>> {
        self.0.send((tracing::Span::current(), event))
    }
}

impl<Event> Clone for Sender<Event> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Event> std::fmt::Debug for Sender<Event> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender").finish_non_exhaustive()
    }
}
