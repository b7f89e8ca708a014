use std::sync::mpsc::{RecvError, SyncSender, sync_channel};

use crate::actor::drag_tracker::TrackerState;
use crate::actor::reactor::{Event, Reactor, Sender};
use crate::model::server::GroupData;
use crate::sys::geometry::Point;
use crate::sys::window::WindowId;

/// Blocking read access to the reactor's model from other threads.
#[derive(Clone)]
pub struct ReactorQueryHandle {
    tx: Sender,
}

impl ReactorQueryHandle {
    pub(super) fn new(tx: Sender) -> Self { Self { tx } }

    fn send_query<T>(
        &self,
        build: impl FnOnce(SyncSender<T>) -> QueryRequest,
    ) -> Result<T, RecvError> {
        let (tx, rx) = sync_channel(1);
        if self.tx.try_send(Event::Query(build(tx))).is_err() {
            return Err(RecvError);
        }
        rx.recv().map_err(|_| RecvError)
    }

    /// Every group in creation order. Empty once the reactor has stopped.
    pub fn groups(&self) -> Vec<GroupData> { self.send_query(QueryRequest::Groups).unwrap_or_default() }

    pub fn group_containing(&self, window: WindowId) -> Option<GroupData> {
        self.send_query(|resp| QueryRequest::GroupContaining { window, resp }).ok().flatten()
    }

    /// The group whose overlay drop target contains `point` (bottom-left
    /// origin).
    pub fn group_at(&self, point: Point) -> Option<GroupData> {
        self.send_query(|resp| QueryRequest::GroupAt { point, resp }).ok().flatten()
    }

    pub fn tracker_state(&self) -> Option<TrackerState> {
        self.send_query(QueryRequest::TrackerState).ok()
    }
}

#[derive(Debug)]
pub enum QueryRequest {
    Groups(SyncSender<Vec<GroupData>>),
    GroupContaining {
        window: WindowId,
        resp: SyncSender<Option<GroupData>>,
    },
    GroupAt {
        point: Point,
        resp: SyncSender<Option<GroupData>>,
    },
    TrackerState(SyncSender<TrackerState>),
}

impl Reactor {
    pub(super) fn handle_query_request(&mut self, req: QueryRequest) {
        match req {
            QueryRequest::Groups(resp) => {
                let _ = resp.send(self.registry.snapshot());
            }
            QueryRequest::GroupContaining { window, resp } => {
                let data = self.registry.find_group(window).and_then(|g| self.registry.group_data(g));
                let _ = resp.send(data);
            }
            QueryRequest::GroupAt { point, resp } => {
                let data = self.registry.find_group_at(point).and_then(|g| self.registry.group_data(g));
                let _ = resp.send(data);
            }
            QueryRequest::TrackerState(resp) => {
                let _ = resp.send(self.drag_tracker.state());
            }
        }
    }
}
