//! Fehlertypen fuer Reflektor
//!
//! Zentraler Fehler-Enum fuer Konfiguration, Netzwerk und Validierung.
//! Der Codec definiert einen eigenen `CodecError`.

use thiserror::Error;

/// Globaler Result-Alias fuer Reflektor
pub type Result<T> = std::result::Result<T, ReflektorError>;

/// Alle moeglichen Fehler ausserhalb des Paket-Codecs
#[derive(Debug, Error)]
pub enum ReflektorError {
    // --- Validierung ---
    #[error("Ungueltiges Rufzeichen: {0}")]
    UngueltigesRufzeichen(String),

    #[error("Ungueltiges Modul: '{0}'")]
    UngueltigesModul(char),

    // --- Netzwerk ---
    #[error("Netzwerkfehler: {0}")]
    Netzwerk(#[from] std::io::Error),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}
