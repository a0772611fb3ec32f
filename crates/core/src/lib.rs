//! reflektor-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Reflektor-Crates gemeinsam genutzt werden: Rufzeichen,
//! Modul-Kennungen, Protokoll-Tags und Handles.

pub mod callsign;
pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use callsign::Callsign;
pub use error::{ReflektorError, Result};
pub use types::{modul_index, ClientId, Protocol, StreamHandle, MODUL_ANZAHL};
