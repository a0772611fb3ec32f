//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Reflektor ohne Konfigurationsdatei
//! lauffaehig ist.

use reflektor_dplus::DplusConfig;
use reflektor_protocol::dplus::DPLUS_PORT;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Rufzeichen und Module des Reflektors
    pub reflektor: ReflektorEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Zeitkonstanten des DPlus-Adapters
    pub dplus: DplusEinstellungen,
    /// Whitelist/Blacklist fuer Link und Senden
    pub gatekeeper: GatekeeperEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflektorEinstellungen {
    pub rufzeichen: String,
    /// Aktive Module als Zeichenkette, z.B. "ABCD"
    pub module: String,
}

impl Default for ReflektorEinstellungen {
    fn default() -> Self {
        Self {
            rufzeichen: "XLX000".into(),
            module: "ABCDEFGHIJKLMNOPQRSTUVWXYZ".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    pub bind_adresse: String,
    /// UDP-Port fuer DPlus
    pub dplus_port: u16,
    /// Groesse der Sende-Queue (Pakete)
    pub sende_queue_groesse: usize,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            dplus_port: DPLUS_PORT,
            sende_queue_groesse: reflektor_relay::transport::SENDE_QUEUE_GROESSE,
        }
    }
}

/// Zeitkonstanten in Millisekunden
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DplusEinstellungen {
    pub keepalive_periode_ms: u64,
    pub keepalive_timeout_ms: u64,
    pub stream_timeout_ms: u64,
    pub empfangs_wartezeit_ms: u64,
}

impl Default for DplusEinstellungen {
    fn default() -> Self {
        Self {
            keepalive_periode_ms: 1000,
            keepalive_timeout_ms: 10_000,
            stream_timeout_ms: 1600,
            empfangs_wartezeit_ms: 20,
        }
    }
}

/// Rufzeichen-Muster mit Wildcard `*`; leere Whitelist erlaubt alle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatekeeperEinstellungen {
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Bind-Adresse des DPlus-Sockets
    pub fn dplus_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.dplus_port);
        adresse
            .parse()
            .map_err(|e| anyhow::anyhow!("Ungueltige Bind-Adresse '{adresse}': {e}"))
    }

    /// Zeitkonstanten fuer den DPlus-Adapter
    pub fn dplus_config(&self) -> DplusConfig {
        let d = &self.dplus;
        DplusConfig {
            keepalive_periode: Duration::from_millis(d.keepalive_periode_ms),
            keepalive_timeout: Duration::from_millis(d.keepalive_timeout_ms),
            stream_timeout: Duration::from_millis(d.stream_timeout_ms),
            empfangs_wartezeit: Duration::from_millis(d.empfangs_wartezeit_ms),
        }
    }
}
