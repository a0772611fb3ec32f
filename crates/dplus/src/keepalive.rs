//! Keepalive-Ueberwachung der DPlus-Clients

use std::time::Duration;
use tokio::time::Instant;

use reflektor_core::Protocol;
use reflektor_protocol::dplus;
use reflektor_relay::{Client, ClientDirectory, Transport};

#[derive(Debug)]
pub struct KeepaliveSupervisor {
    periode: Duration,
    timeout: Duration,
    letzter_lauf: Instant,
}

impl KeepaliveSupervisor {
    pub fn neu(periode: Duration, timeout: Duration) -> Self {
        Self {
            periode,
            timeout,
            letzter_lauf: Instant::now(),
        }
    }

    /// Ist seit dem letzten Lauf mindestens eine Periode vergangen?
    pub fn faellig(&self) -> bool {
        self.letzter_lauf.elapsed() >= self.periode
    }

    /// Sendet Keepalives und entfernt inaktive Clients
    ///
    /// Clients, die gerade senden (Master), gelten als lebendig. Inaktive
    /// Clients erhalten ein Disconnect und werden aus dem Verzeichnis
    /// entfernt; die entfernten Clients werden zurueckgegeben.
    pub fn ausfuehren(&mut self, clients: &ClientDirectory, transport: &dyn Transport) -> Vec<Client> {
        self.letzter_lauf = Instant::now();

        let keepalive = dplus::keepalive_kodieren();
        let mut verzeichnis = clients.sperren();
        let mut abgelaufen = Vec::new();

        for client in verzeichnis.nach_protokoll_mut(Protocol::DPlus) {
            transport.senden(keepalive.clone(), client.adresse);

            if client.ist_master() {
                client.lebenszeichen();
            } else if client.ist_inaktiv(self.timeout) {
                tracing::info!(
                    rufzeichen = %client.rufzeichen,
                    adresse = %client.adresse,
                    "DPlus-Client Keepalive-Timeout"
                );
                transport.senden(dplus::disconnect_kodieren(), client.adresse);
                abgelaufen.push(client.id);
            }
        }

        abgelaufen
            .into_iter()
            .filter_map(|id| verzeichnis.entfernen(id))
            .collect()
    }
}
