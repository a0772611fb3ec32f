//! Gemeinsame Identifikationstypen fuer Reflektor
//!
//! Newtypes fuer Client- und Stream-Kennungen, damit sie zur Compilezeit
//! nicht mit anderen Zahlen verwechselt werden koennen.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Anzahl der Module eines Reflektors (`A` bis `Z`)
pub const MODUL_ANZAHL: usize = 26;

/// Liefert den Index eines Moduls (`A` = 0 … `Z` = 25)
pub fn modul_index(modul: char) -> Option<usize> {
    if modul.is_ascii_uppercase() {
        Some(modul as usize - 'A' as usize)
    } else {
        None
    }
}

/// Protokoll-Tag eines Clients im gemeinsamen Client-Verzeichnis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    DExtra,
    DPlus,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DExtra => "DExtra",
            Self::DPlus => "DPlus",
        };
        f.write_str(name)
    }
}

/// Eindeutige Client-ID im Client-Verzeichnis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl ClientId {
    /// Vergibt eine neue, prozessweit eindeutige ClientId
    pub fn new() -> Self {
        static NAECHSTE: AtomicU64 = AtomicU64::new(1);
        Self(NAECHSTE.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client:{}", self.0)
    }
}

/// Nicht-besitzende Referenz auf einen Stream im Relay-Kern
///
/// Die Generation unterscheidet wiederverwendete Stream-IDs: schliesst der
/// Kern einen Stream, passt ein altes Handle nicht mehr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle {
    pub stream_id: u16,
    pub generation: u64,
}

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream:{:04X}/{}", self.stream_id, self.generation)
    }
}
