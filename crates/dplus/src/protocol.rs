//! DPlus-Adapter – Task-Loop und Eingangsverarbeitung
//!
//! ```text
//! loop {
//!     1. hoechstens ein Datagramm empfangen (Wartezeit 20ms) und verarbeiten
//!     2. abgelaufene Streams beim Kern schliessen
//!     3. Ausgangs-Queue abarbeiten
//!     4. Keepalive-Runde, wenn faellig
//! }
//! ```
//!
//! Eingehende Datagramme werden in dieser Reihenfolge geprueft: Frame,
//! Header, Last-Frame, Connect, Login, Disconnect, Keepalive. Alles andere
//! wird verworfen.

use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;

use reflektor_core::{Callsign, Protocol, StreamHandle};
use reflektor_protocol::dplus::{self, DplusPaket};
use reflektor_protocol::{DvFramePacket, DvHeaderPacket, DvLastFramePacket, DvPacket};
use reflektor_relay::transport::UDP_PUFFER_GROESSE;
use reflektor_relay::{Client, ClientDirectory, Gatekeeper, PacketQueue, RelayCore, Transport};

use crate::config::DplusConfig;
use crate::dispatcher::{dongle_muster, Dispatcher};
use crate::keepalive::KeepaliveSupervisor;
use crate::streams::StreamRegistry;

/// Der DPlus-Protokoll-Adapter
///
/// Laeuft in einem eigenen Task; Registry, Header-Cache und Keepalive-Timer
/// gehoeren exklusiv dem Adapter. Verzeichnis und Queue sind geteilt.
pub struct DplusProtocol {
    config: DplusConfig,
    transport: Arc<dyn Transport>,
    clients: ClientDirectory,
    gatekeeper: Arc<dyn Gatekeeper>,
    kern: Arc<dyn RelayCore>,
    queue: PacketQueue,
    streams: StreamRegistry,
    dispatcher: Dispatcher,
    keepalive: KeepaliveSupervisor,
}

impl DplusProtocol {
    pub fn neu(
        config: DplusConfig,
        transport: Arc<dyn Transport>,
        clients: ClientDirectory,
        gatekeeper: Arc<dyn Gatekeeper>,
        kern: Arc<dyn RelayCore>,
        queue: PacketQueue,
    ) -> Self {
        let keepalive = KeepaliveSupervisor::neu(config.keepalive_periode, config.keepalive_timeout);
        Self {
            config,
            transport,
            clients,
            gatekeeper,
            kern,
            queue,
            streams: StreamRegistry::neu(),
            dispatcher: Dispatcher::neu(),
            keepalive,
        }
    }

    pub fn streams(&self) -> &StreamRegistry {
        &self.streams
    }

    /// Startet die Task-Loop (laeuft bis `shutdown_rx` ein Signal sendet)
    pub async fn starten(mut self, mut shutdown_rx: tokio::sync::oneshot::Receiver<()>) {
        tracing::info!("DPlus-Adapter gestartet");

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::info!("DPlus-Adapter: Shutdown-Signal empfangen");
                    break;
                }
                _ = self.task() => {}
            }
        }

        tracing::info!("DPlus-Adapter beendet");
    }

    /// Ein Durchlauf der Task-Loop
    pub async fn task(&mut self) {
        let mut buf = [0u8; UDP_PUFFER_GROESSE];
        if let Some((laenge, absender)) = self
            .transport
            .empfangen(&mut buf, self.config.empfangs_wartezeit)
            .await
        {
            self.paket_verarbeiten(&buf[..laenge], absender);
        }

        self.streams_pruefen();
        self.queue_abarbeiten();

        if self.keepalive.faellig() {
            self.keepalive.ausfuehren(&self.clients, self.transport.as_ref());
        }
    }

    // -----------------------------------------------------------------------
    // Eingang
    // -----------------------------------------------------------------------

    /// Verarbeitet ein eingehendes Datagramm
    pub fn paket_verarbeiten(&mut self, daten: &[u8], absender: SocketAddr) {
        let paket = match dplus::dekodieren(daten) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(
                    fehler = %e,
                    adresse = %absender,
                    laenge = daten.len(),
                    "Unbekanntes DPlus-Paket"
                );
                return;
            }
        };

        match paket {
            DplusPaket::Frame(frame) => self.frame_empfangen(frame, absender),
            DplusPaket::Header(header) => {
                if self.gatekeeper.darf_senden(
                    &header.my,
                    absender,
                    Protocol::DPlus,
                    header.rpt2_modul(),
                ) {
                    self.header_empfangen(header, absender);
                }
            }
            DplusPaket::LastFrame(frame) => self.last_frame_empfangen(frame, absender),
            DplusPaket::Connect => {
                tracing::debug!(adresse = %absender, "DPlus-Connect");
                self.transport.senden(Bytes::from_static(&dplus::CONNECT), absender);
            }
            DplusPaket::Login(rufzeichen) => self.login_empfangen(rufzeichen, absender),
            DplusPaket::Disconnect => self.disconnect_empfangen(absender),
            DplusPaket::Keepalive => {
                for client in self.clients.sperren().nach_adresse_mut(absender, Protocol::DPlus) {
                    client.lebenszeichen();
                }
            }
        }
    }

    fn header_empfangen(&mut self, header: DvHeaderPacket, absender: SocketAddr) {
        if self.offenen_stream_finden(header.stream_id).is_some() {
            self.streams.anstupsen(header.stream_id);
            return;
        }

        let modul = header.rpt2_modul();
        if !self.kern.ist_gueltiges_modul(modul) {
            tracing::warn!(
                modul = %modul,
                rufzeichen = %header.my,
                adresse = %absender,
                "DPlus-Header fuer ungueltiges Modul verworfen"
            );
            return;
        }

        let mut rpt1 = header.rpt1;
        let handle = {
            let mut clients = self.clients.sperren();
            match clients.finden_mut(absender, Protocol::DPlus) {
                Some(client) => {
                    if header.rpt2.passt_auf(&dongle_muster()) {
                        client.dextra_dongle_setzen();
                    }
                    if !client.hat_modul() {
                        client.modul_setzen(header.rpt1.modul());
                    }
                    rpt1 = client.rufzeichen_mit_modul();
                    self.kern.stream_oeffnen(&header, client)
                }
                None => None,
            }
        };

        if let Some(handle) = handle {
            self.streams.registrieren(handle, absender);
        }
        self.kern.zuletzt_gehoert(&header.my, &rpt1, &header.rpt2);
    }

    fn frame_empfangen(&mut self, frame: DvFramePacket, absender: SocketAddr) {
        if let Some(handle) = self.stream_von(frame.stream_id, absender) {
            self.streams.anstupsen(frame.stream_id);
            self.kern.paket_einspeisen(handle, DvPacket::Frame(frame));
        }
    }

    fn last_frame_empfangen(&mut self, frame: DvLastFramePacket, absender: SocketAddr) {
        let stream_id = frame.stream_id;
        if let Some(handle) = self.stream_von(stream_id, absender) {
            self.kern.paket_einspeisen(handle, DvPacket::LastFrame(frame));
            self.kern.stream_schliessen(handle);
            self.streams.entfernen(stream_id);
        }
    }

    fn login_empfangen(&mut self, rufzeichen: Callsign, absender: SocketAddr) {
        if self.gatekeeper.darf_verbinden(&rufzeichen, absender, Protocol::DPlus) {
            self.transport.senden(dplus::login_ack_kodieren(), absender);
            self.clients
                .sperren()
                .hinzufuegen(Client::neu(rufzeichen, absender, Protocol::DPlus));
        } else {
            self.transport.senden(dplus::login_nack_kodieren(), absender);
        }
    }

    fn disconnect_empfangen(&mut self, absender: SocketAddr) {
        let entfernt = {
            let mut clients = self.clients.sperren();
            let id = clients.finden(absender, Protocol::DPlus).map(|c| c.id);
            id.and_then(|id| clients.entfernen(id))
        };

        if entfernt.is_some() {
            self.transport.senden(dplus::disconnect_kodieren(), absender);
        }
    }

    // -----------------------------------------------------------------------
    // Streams
    // -----------------------------------------------------------------------

    /// Handle eines lokal bekannten Streams, der beim Kern noch offen ist
    ///
    /// Vom Kern bereits geschlossene Streams werden lokal entfernt und gelten
    /// als nicht gefunden.
    fn offenen_stream_finden(&mut self, stream_id: u16) -> Option<StreamHandle> {
        let handle = self.streams.finden(stream_id)?.handle;
        if self.kern.stream_offen(handle) {
            Some(handle)
        } else {
            self.streams.entfernen(stream_id);
            None
        }
    }

    /// Wie `offenen_stream_finden`, aber nur fuer den Absender des Streams
    fn stream_von(&mut self, stream_id: u16, absender: SocketAddr) -> Option<StreamHandle> {
        let handle = self.offenen_stream_finden(stream_id)?;
        let stream = self.streams.finden(stream_id)?;
        (stream.absender == absender).then_some(handle)
    }

    fn streams_pruefen(&mut self) {
        for handle in self.streams.abgelaufene_entfernen(self.config.stream_timeout) {
            tracing::info!(stream = %handle, "DPlus-Stream-Timeout");
            self.kern.stream_schliessen(handle);
        }
    }

    fn queue_abarbeiten(&mut self) {
        self.dispatcher.abarbeiten(
            &self.queue,
            &self.clients,
            self.kern.as_ref(),
            self.transport.as_ref(),
        );
    }
}
