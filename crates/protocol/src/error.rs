//! Fehlertypen fuer den Paket-Codec

use thiserror::Error;

/// Fehler beim Dekodieren oder Kodieren eines Datagramms
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Unbekanntes Paket ({laenge} Bytes)")]
    Unbekannt { laenge: usize },

    #[error("Falsche Paketlaenge: {laenge} Bytes (erwartet {erwartet})")]
    FalscheLaenge { laenge: usize, erwartet: usize },

    #[error("Falsche Kennung bei Offset {offset}")]
    FalscheKennung { offset: usize },

    #[error("Ungueltiges Rufzeichen: {0}")]
    UngueltigesRufzeichen(String),
}
