//! Relay-Kern – Streams, Module und Last-Heard
//!
//! Der Kern besitzt die offenen Streams. Adapter halten nur ein
//! `StreamHandle` (Stream-ID + Generation) und fragen den Kern, ob der
//! Stream noch offen ist. Pakete eines Streams werden an die Ausgangs-Queues
//! aller registrierten Adapter verteilt.
//!
//! ```text
//! Adapter A (Eingang)               Adapter B (Ausgang)
//!     |                                  ^
//!     v                                  |
//! stream_oeffnen / paket_einspeisen --> PacketQueue (pro Adapter)
//! ```

use dashmap::DashMap;
use parking_lot::Mutex;
use reflektor_core::{modul_index, Callsign, ClientId, ReflektorError, StreamHandle};
use reflektor_protocol::{DvHeaderPacket, DvPacket, QueueEntry};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;

use crate::clients::{Client, ClientDirectory};
use crate::queue::PacketQueue;

/// Maximale Laenge der Last-Heard-Liste
pub const LAST_HEARD_GROESSE: usize = 20;

// ---------------------------------------------------------------------------
// RelayCore
// ---------------------------------------------------------------------------

/// Schnittstelle des Relay-Kerns fuer die Protokoll-Adapter
pub trait RelayCore: Send + Sync {
    /// Oeffnet einen Stream fuer `client` auf dem Modul von RPT2
    ///
    /// Der Aufrufer haelt dabei die Sperre des Client-Verzeichnisses; der
    /// Kern darf das Verzeichnis hier nicht erneut sperren.
    fn stream_oeffnen(&self, header: &DvHeaderPacket, client: &mut Client) -> Option<StreamHandle>;

    /// Schliesst einen Stream (ohne Wirkung wenn bereits geschlossen)
    ///
    /// Sperrt das Client-Verzeichnis, um den Master-Status zurueckzusetzen.
    fn stream_schliessen(&self, handle: StreamHandle);

    fn stream_offen(&self, handle: StreamHandle) -> bool;

    /// Speist ein Paket eines offenen Streams in den Kern ein
    fn paket_einspeisen(&self, handle: StreamHandle, paket: DvPacket);

    fn ist_gueltiges_modul(&self, modul: char) -> bool;

    fn modul_index(&self, modul: char) -> Option<usize>;

    /// Aktualisiert die Last-Heard-Liste
    fn zuletzt_gehoert(&self, my: &Callsign, rpt1: &Callsign, rpt2: &Callsign);
}

// ---------------------------------------------------------------------------
// LocalReflector
// ---------------------------------------------------------------------------

/// Eintrag der Last-Heard-Liste
#[derive(Debug, Clone)]
pub struct GehoertEintrag {
    pub my: Callsign,
    pub rpt1: Callsign,
    pub rpt2: Callsign,
    pub zeitpunkt: Instant,
}

#[derive(Debug, Clone, Copy)]
struct OffenerStream {
    handle: StreamHandle,
    besitzer: ClientId,
}

/// In-Process Relay-Kern: ein Stream pro Modul
pub struct LocalReflector {
    rufzeichen: Callsign,
    module: Vec<char>,
    clients: ClientDirectory,
    queues: Vec<PacketQueue>,
    /// Offene Streams, indexiert nach Modul
    streams: DashMap<char, OffenerStream>,
    generation: AtomicU64,
    gehoert: Mutex<VecDeque<GehoertEintrag>>,
}

impl LocalReflector {
    /// Erstellt den Kern fuer die angegebenen Module (z.B. "ABCD")
    ///
    /// # Fehler
    /// - `UngueltigesRufzeichen` fuer ein ungueltiges Reflektor-Rufzeichen
    /// - `Konfiguration` wenn keine Module angegeben sind
    /// - `UngueltigesModul` wenn ein Zeichen kein Grossbuchstabe ist
    pub fn neu(
        rufzeichen: Callsign,
        module: &str,
        clients: ClientDirectory,
        queues: Vec<PacketQueue>,
    ) -> reflektor_core::Result<Self> {
        if !rufzeichen.ist_gueltig() {
            return Err(ReflektorError::UngueltigesRufzeichen(rufzeichen.to_string()));
        }
        let module: Vec<char> = module.chars().collect();
        if module.is_empty() {
            return Err(ReflektorError::Konfiguration("keine Module angegeben".into()));
        }
        if let Some(m) = module.iter().find(|m| modul_index(**m).is_none()) {
            return Err(ReflektorError::UngueltigesModul(*m));
        }

        Ok(Self {
            rufzeichen,
            module,
            clients,
            queues,
            streams: DashMap::new(),
            generation: AtomicU64::new(1),
            gehoert: Mutex::new(VecDeque::with_capacity(LAST_HEARD_GROESSE)),
        })
    }

    /// Anzahl der aktuell offenen Streams
    pub fn offene_streams(&self) -> usize {
        self.streams.len()
    }

    /// Last-Heard-Liste, neuester Eintrag zuerst
    pub fn zuletzt_gehoert_liste(&self) -> Vec<GehoertEintrag> {
        self.gehoert.lock().iter().cloned().collect()
    }

    fn modul_von(&self, handle: StreamHandle) -> Option<char> {
        self.streams
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| *e.key())
    }

    fn verteilen(&self, modul: char, paket: DvPacket) {
        for queue in &self.queues {
            queue.einreihen(QueueEntry::neu(modul, paket.clone()));
        }
    }
}

impl RelayCore for LocalReflector {
    fn stream_oeffnen(&self, header: &DvHeaderPacket, client: &mut Client) -> Option<StreamHandle> {
        let modul = header.rpt2_modul();
        if !self.ist_gueltiges_modul(modul) {
            return None;
        }

        let handle = match self.streams.entry(modul) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                tracing::debug!(
                    modul = %modul,
                    rufzeichen = %header.my,
                    "Modul belegt, Stream wird nicht geoeffnet"
                );
                return None;
            }
            dashmap::mapref::entry::Entry::Vacant(frei) => {
                let handle = StreamHandle {
                    stream_id: header.stream_id,
                    generation: self.generation.fetch_add(1, Ordering::Relaxed),
                };
                frei.insert(OffenerStream {
                    handle,
                    besitzer: client.id,
                });
                handle
            }
        };

        client.master_setzen(Some(modul));
        tracing::info!(
            reflektor = %self.rufzeichen,
            modul = %modul,
            rufzeichen = %header.my,
            client = %client.rufzeichen,
            stream = %handle,
            "Stream geoeffnet"
        );

        self.verteilen(modul, DvPacket::Header(header.clone()));
        Some(handle)
    }

    fn stream_schliessen(&self, handle: StreamHandle) {
        let Some(modul) = self.modul_von(handle) else {
            return;
        };
        let Some((_, stream)) = self.streams.remove_if(&modul, |_, s| s.handle == handle) else {
            return;
        };

        if let Some(client) = self.clients.sperren().get_mut(stream.besitzer) {
            client.master_setzen(None);
        }
        tracing::info!(modul = %modul, stream = %handle, "Stream geschlossen");
    }

    fn stream_offen(&self, handle: StreamHandle) -> bool {
        self.modul_von(handle).is_some()
    }

    fn paket_einspeisen(&self, handle: StreamHandle, paket: DvPacket) {
        match self.modul_von(handle) {
            Some(modul) => self.verteilen(modul, paket),
            None => tracing::debug!(stream = %handle, "Paket fuer geschlossenen Stream verworfen"),
        }
    }

    fn ist_gueltiges_modul(&self, modul: char) -> bool {
        self.module.contains(&modul)
    }

    fn modul_index(&self, modul: char) -> Option<usize> {
        if self.ist_gueltiges_modul(modul) {
            modul_index(modul)
        } else {
            None
        }
    }

    fn zuletzt_gehoert(&self, my: &Callsign, rpt1: &Callsign, rpt2: &Callsign) {
        let mut liste = self.gehoert.lock();
        liste.retain(|e| e.my != *my);
        liste.push_front(GehoertEintrag {
            my: *my,
            rpt1: *rpt1,
            rpt2: *rpt2,
            zeitpunkt: Instant::now(),
        });
        liste.truncate(LAST_HEARD_GROESSE);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
