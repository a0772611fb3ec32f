//! Ausgangs-Dispatcher
//!
//! Arbeitet die Ausgangs-Queue ab, kodiert jedes Paket einmal und verteilt
//! es an alle DPlus-Clients, die nicht selbst senden.
//!
//! ```text
//! PacketQueue --pop--> kodieren --+--> Client 1 (Header je nach Familie)
//!                                 +--> Client 2
//!                                 +--> ...
//! ```
//!
//! Header werden pro Client angepasst:
//!
//! | Familie     | gesendet                         |
//! |-------------|----------------------------------|
//! | Unbestimmt  | XRF-Variante, danach Original    |
//! | Dongle      | XRF-Variante                     |
//! | Nativ       | Original                         |
//!
//! Der Frame-Zaehler eines Moduls laeuft pro Empfaenger. Wird dabei ein
//! Vielfaches von 21 erreicht, bekommt nur dieser Empfaenger den Header
//! des Moduls erneut.

use bytes::Bytes;
use reflektor_core::{Callsign, Protocol};
use reflektor_protocol::{dplus, CodecError, DvHeaderPacket, DvPacket};
use reflektor_relay::{Client, ClientDirectory, ClientFamilie, PacketQueue, RelayCore, Transport};

use crate::cache::ModulCache;

/// Praefix, mit dem RPT2 fuer Dongle-Clients ueberschrieben wird
pub const PATCH_PRAEFIX: &[u8] = b"XRF";

/// Muster fuer RPT2 von DExtra-Dongles
pub const DONGLE_MUSTER: &str = "XRF*";

pub fn dongle_muster() -> Callsign {
    Callsign::from(DONGLE_MUSTER)
}

/// Beide kodierten Varianten eines Headers
#[derive(Debug, Clone)]
struct HeaderVarianten {
    nativ: Bytes,
    gepatcht: Bytes,
}

impl HeaderVarianten {
    fn kodieren(header: &DvHeaderPacket) -> Result<Self, CodecError> {
        let nativ = dplus::header_kodieren(header)?;

        let mut kopie = header.clone();
        kopie.rpt2.patchen(0, PATCH_PRAEFIX);
        let gepatcht = dplus::header_kodieren(&kopie)?;

        Ok(Self { nativ, gepatcht })
    }

    fn senden(&self, client: &Client, transport: &dyn Transport) {
        match client.familie() {
            ClientFamilie::Unbestimmt => {
                transport.senden(self.gepatcht.clone(), client.adresse);
                transport.senden(self.nativ.clone(), client.adresse);
            }
            ClientFamilie::Dongle => transport.senden(self.gepatcht.clone(), client.adresse),
            ClientFamilie::Nativ => transport.senden(self.nativ.clone(), client.adresse),
        }
    }
}

/// Kodierte Form eines Queue-Eintrags
enum Ausgabe {
    Header(HeaderVarianten),
    Frame(Bytes),
    LastFrame(Bytes),
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    cache: ModulCache,
}

impl Dispatcher {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &ModulCache {
        &self.cache
    }

    /// Arbeitet die Queue vollstaendig ab und liefert die Anzahl der Eintraege
    pub fn abarbeiten(
        &mut self,
        queue: &PacketQueue,
        clients: &ClientDirectory,
        kern: &dyn RelayCore,
        transport: &dyn Transport,
    ) -> usize {
        // Queue-Sperre nicht halten, waehrend das Verzeichnis gesperrt ist
        let eintraege = std::mem::take(&mut *queue.sperren());
        let anzahl = eintraege.len();

        for eintrag in eintraege {
            let index = kern.modul_index(eintrag.modul);
            if index.is_none() {
                tracing::warn!(modul = %eintrag.modul, "Queue-Eintrag fuer unbekanntes Modul");
            }

            let Some(ausgabe) = self.vorbereiten(index, &eintrag.paket) else {
                continue;
            };

            let verzeichnis = clients.sperren();
            for client in verzeichnis.nach_protokoll(Protocol::DPlus) {
                if client.ist_master() {
                    continue;
                }
                match &ausgabe {
                    Ausgabe::Header(varianten) => varianten.senden(client, transport),
                    Ausgabe::Frame(puffer) => {
                        transport.senden(puffer.clone(), client.adresse);
                        if let Some(varianten) = self.wiederholung(index) {
                            varianten.senden(client, transport);
                        }
                    }
                    Ausgabe::LastFrame(puffer) => transport.senden(puffer.clone(), client.adresse),
                }
            }
        }

        anzahl
    }

    /// Aktualisiert den Cache und kodiert das Paket
    ///
    /// `None` wenn die Kodierung fehlschlaegt; der Eintrag wird verworfen.
    fn vorbereiten(&mut self, index: Option<usize>, paket: &DvPacket) -> Option<Ausgabe> {
        let ergebnis = match paket {
            DvPacket::Header(header) => {
                if let Some(index) = index {
                    self.cache.header_setzen(index, header.clone());
                }
                HeaderVarianten::kodieren(header).map(Ausgabe::Header)
            }
            DvPacket::Frame(frame) => Ok(Ausgabe::Frame(dplus::frame_kodieren(frame))),
            DvPacket::LastFrame(frame) => Ok(Ausgabe::LastFrame(dplus::last_frame_kodieren(frame))),
        };

        match ergebnis {
            Ok(ausgabe) => Some(ausgabe),
            Err(e) => {
                tracing::error!(
                    fehler = %e,
                    stream_id = paket.stream_id(),
                    "Paket nicht kodierbar, wird verworfen"
                );
                None
            }
        }
    }

    /// Zaehlt einen Frame fuer einen Empfaenger; liefert den Header, wenn
    /// er erneut gesendet werden muss
    fn wiederholung(&mut self, index: Option<usize>) -> Option<HeaderVarianten> {
        let header = self.cache.frame_zaehlen(index?)?;
        match HeaderVarianten::kodieren(&header) {
            Ok(varianten) => Some(varianten),
            Err(e) => {
                tracing::error!(fehler = %e, "Header-Wiederholung nicht kodierbar");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
