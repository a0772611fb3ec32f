//! Lokal verfolgte Streams
//!
//! Der Relay-Kern besitzt die Streams; der Adapter merkt sich pro Stream-ID
//! nur das Handle, die Absender-Adresse und den Zeitpunkt der letzten
//! Aktivitaet fuer die Timeout-Pruefung.

use reflektor_core::StreamHandle;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::Instant;

/// Lokaler Eintrag eines offenen Streams
#[derive(Debug, Clone)]
pub struct LokalerStream {
    pub handle: StreamHandle,
    pub absender: SocketAddr,
    letzte_aktivitaet: Instant,
}

impl LokalerStream {
    fn ist_abgelaufen(&self, timeout: Duration) -> bool {
        self.letzte_aktivitaet.elapsed() > timeout
    }
}

#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: HashMap<u16, LokalerStream>,
}

impl StreamRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Merkt sich einen vom Kern geoeffneten Stream
    pub fn registrieren(&mut self, handle: StreamHandle, absender: SocketAddr) {
        self.streams.insert(
            handle.stream_id,
            LokalerStream {
                handle,
                absender,
                letzte_aktivitaet: Instant::now(),
            },
        );
    }

    pub fn finden(&self, stream_id: u16) -> Option<&LokalerStream> {
        self.streams.get(&stream_id)
    }

    /// Setzt die Timeout-Frist eines Streams zurueck
    pub fn anstupsen(&mut self, stream_id: u16) {
        if let Some(stream) = self.streams.get_mut(&stream_id) {
            stream.letzte_aktivitaet = Instant::now();
        }
    }

    pub fn entfernen(&mut self, stream_id: u16) -> Option<LokalerStream> {
        self.streams.remove(&stream_id)
    }

    /// Entfernt alle Streams ohne Aktivitaet seit `timeout`
    ///
    /// Die Handles werden zurueckgegeben, damit der Aufrufer sie beim Kern
    /// schliessen kann.
    pub fn abgelaufene_entfernen(&mut self, timeout: Duration) -> Vec<StreamHandle> {
        let mut abgelaufen = Vec::new();
        self.streams.retain(|_, stream| {
            if stream.ist_abgelaufen(timeout) {
                abgelaufen.push(stream.handle);
                false
            } else {
                true
            }
        });
        abgelaufen
    }

    pub fn anzahl(&self) -> usize {
        self.streams.len()
    }

    pub fn ist_leer(&self) -> bool {
        self.streams.is_empty()
    }
}
