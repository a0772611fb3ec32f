//! reflektor-server – Bibliotheks-Root
//!
//! Verdrahtet Client-Verzeichnis, Gatekeeper, Relay-Kern, UDP-Transport und
//! DPlus-Adapter und stellt den Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::Result;
use config::ServerConfig;
use std::sync::Arc;

use reflektor_core::Callsign;
use reflektor_dplus::DplusProtocol;
use reflektor_relay::{ClientDirectory, ListGatekeeper, LocalReflector, PacketQueue, UdpTransport};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Relay-Kern mit Client-Verzeichnis und Ausgangs-Queue anlegen
    /// 2. UDP-Socket fuer DPlus binden
    /// 3. DPlus-Adapter in eigenem Task starten
    /// 4. Auf Ctrl-C warten und den Adapter beenden
    pub async fn starten(self) -> Result<()> {
        let rufzeichen = Callsign::from(self.config.reflektor.rufzeichen.as_str());
        tracing::info!(
            rufzeichen = %rufzeichen,
            module = %self.config.reflektor.module,
            "Reflektor startet"
        );

        let clients = ClientDirectory::neu();
        let queue = PacketQueue::neu();
        let kern = Arc::new(LocalReflector::neu(
            rufzeichen,
            &self.config.reflektor.module,
            clients.clone(),
            vec![queue.clone()],
        )?);

        let gatekeeper = Arc::new(ListGatekeeper::neu(
            &self.config.gatekeeper.whitelist,
            &self.config.gatekeeper.blacklist,
        ));

        let transport = Arc::new(
            UdpTransport::binden(
                self.config.dplus_bind_adresse()?,
                self.config.netzwerk.sende_queue_groesse,
            )
            .await?,
        );

        let adapter = DplusProtocol::neu(
            self.config.dplus_config(),
            transport,
            clients,
            gatekeeper,
            kern,
            queue,
        );

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let adapter_task = tokio::spawn(adapter.starten(shutdown_rx));

        tracing::info!("Reflektor laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Reflektor wird beendet");

        let _ = shutdown_tx.send(());
        adapter_task.await?;

        Ok(())
    }
}
