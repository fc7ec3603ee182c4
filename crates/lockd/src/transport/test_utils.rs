//! Test helpers for the transport module.

use std::sync::{Arc, Mutex, PoisonError};

use super::{ConnectionHandler, ConnectionStream};
use crate::HolderId;

/// Records the holder identity of every connection it is handed.
pub(crate) struct RecordingHandler {
    holders: Arc<Mutex<Vec<HolderId>>>,
}

impl RecordingHandler {
    pub(crate) fn new() -> (Arc<Mutex<Vec<HolderId>>>, Arc<Self>) {
        let holders = Arc::new(Mutex::new(Vec::new()));
        let handler = Arc::new(Self {
            holders: Arc::clone(&holders),
        });
        (holders, handler)
    }
}

impl ConnectionHandler for RecordingHandler {
    fn handle(&self, _stream: ConnectionStream, holder: HolderId) {
        self.holders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(holder);
    }
}
