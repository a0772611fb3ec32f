//! Zeitkonstanten des DPlus-Adapters

use std::time::Duration;

/// Konfiguration des DPlus-Adapters
#[derive(Debug, Clone)]
pub struct DplusConfig {
    /// Abstand zwischen zwei Keepalive-Runden
    pub keepalive_periode: Duration,
    /// Clients ohne Lebenszeichen in dieser Zeit werden entfernt
    pub keepalive_timeout: Duration,
    /// Streams ohne Aktivitaet in dieser Zeit werden geschlossen
    pub stream_timeout: Duration,
    /// Maximale Wartezeit auf ein Datagramm pro Durchlauf
    pub empfangs_wartezeit: Duration,
}

impl Default for DplusConfig {
    fn default() -> Self {
        Self {
            keepalive_periode: Duration::from_secs(1),
            keepalive_timeout: Duration::from_secs(10),
            stream_timeout: Duration::from_millis(1600),
            empfangs_wartezeit: Duration::from_millis(20),
        }
    }
}
