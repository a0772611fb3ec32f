//! Ausgangs-Queue eines Protokoll-Adapters
//!
//! Der Relay-Kern legt hier Pakete anderer Adapter ab (Produzent), der
//! Adapter arbeitet sie in seiner Task-Loop ab (Konsument). FIFO, geschuetzt
//! durch einen `parking_lot::Mutex`.

use parking_lot::{Mutex, MutexGuard};
use reflektor_protocol::QueueEntry;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct PacketQueue {
    inner: Arc<Mutex<VecDeque<QueueEntry>>>,
}

impl PacketQueue {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Haengt einen Eintrag ans Ende der Queue
    pub fn einreihen(&self, eintrag: QueueEntry) {
        self.inner.lock().push_back(eintrag);
    }

    /// Sperrt die Queue fuer das Abarbeiten
    pub fn sperren(&self) -> MutexGuard<'_, VecDeque<QueueEntry>> {
        self.inner.lock()
    }

    pub fn laenge(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn ist_leer(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
