//! UDP-Transport – Empfang mit Wartezeit, Senden ueber eine Queue
//!
//! ```text
//! Adapter-Loop
//!     |  senden(bytes, ziel)  -> mpsc (try_send, nie blockierend)
//!     |                               |
//!     |                               v
//!     |                         Sende-Task --> UdpSocket::send_to
//!     |
//!     +- empfangen(buf, 20ms) <- UdpSocket::recv_from (mit timeout)
//! ```
//!
//! Senden blockiert nie. Damit duerfen Adapter auch waehrend einer
//! gehaltenen Verzeichnis-Sperre senden.

use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

#[cfg(any(test, feature = "test-util"))]
use parking_lot::Mutex;
#[cfg(any(test, feature = "test-util"))]
use std::collections::VecDeque;

/// Maximale Datagramm-Groesse
pub const UDP_PUFFER_GROESSE: usize = 2048;

/// Standard-Groesse der Sende-Queue (Pakete)
pub const SENDE_QUEUE_GROESSE: usize = 1024;

/// Transport-Schnittstelle der Protokoll-Adapter
#[async_trait]
pub trait Transport: Send + Sync {
    /// Reiht ein Datagramm zum Senden ein (fire-and-forget)
    fn senden(&self, daten: Bytes, ziel: SocketAddr);

    /// Wartet hoechstens `wartezeit` auf ein Datagramm
    async fn empfangen(&self, buf: &mut [u8], wartezeit: Duration) -> Option<(usize, SocketAddr)>;
}

// ---------------------------------------------------------------------------
// UdpTransport
// ---------------------------------------------------------------------------

pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    tx: mpsc::Sender<(Bytes, SocketAddr)>,
    _task: tokio::task::JoinHandle<()>,
}

impl UdpTransport {
    /// Bindet den Socket und startet den Sende-Task
    pub async fn binden(addr: SocketAddr, queue_groesse: usize) -> reflektor_core::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        tracing::info!(addr = %socket.local_addr()?, "UDP-Socket gebunden");

        let (tx, mut rx) = mpsc::channel::<(Bytes, SocketAddr)>(queue_groesse);
        let sende_socket = Arc::clone(&socket);
        let task = tokio::spawn(async move {
            while let Some((daten, ziel)) = rx.recv().await {
                if let Err(e) = sende_socket.send_to(&daten, ziel).await {
                    tracing::warn!(fehler = %e, ziel = %ziel, "UDP-Sendefehler");
                }
            }
            tracing::debug!("Sende-Task beendet");
        });

        Ok(Self {
            socket,
            tx,
            _task: task,
        })
    }

    pub fn lokale_adresse(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn senden(&self, daten: Bytes, ziel: SocketAddr) {
        match self.tx.try_send((daten, ziel)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(ziel = %ziel, "Sende-Queue voll – Paket verworfen");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(ziel = %ziel, "Sende-Queue geschlossen");
            }
        }
    }

    async fn empfangen(&self, buf: &mut [u8], wartezeit: Duration) -> Option<(usize, SocketAddr)> {
        match tokio::time::timeout(wartezeit, self.socket.recv_from(buf)).await {
            Ok(Ok(ergebnis)) => Some(ergebnis),
            Ok(Err(e)) => {
                tracing::error!(fehler = %e, "UDP-Empfangsfehler");
                None
            }
            Err(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// AufzeichnenderTransport
// ---------------------------------------------------------------------------

/// Transport ohne Netzwerk: zeichnet gesendete Datagramme auf und liefert
/// vorab eingereihte Datagramme beim Empfang aus
///
/// Nur mit dem Feature `test-util` verfuegbar.
#[cfg(any(test, feature = "test-util"))]
#[derive(Default)]
pub struct AufzeichnenderTransport {
    gesendet: Mutex<Vec<(Bytes, SocketAddr)>>,
    eingang: Mutex<VecDeque<(Vec<u8>, SocketAddr)>>,
}

#[cfg(any(test, feature = "test-util"))]
impl AufzeichnenderTransport {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Reiht ein Datagramm ein, das beim naechsten `empfangen` geliefert wird
    pub fn eingang_einreihen(&self, daten: &[u8], absender: SocketAddr) {
        self.eingang.lock().push_back((daten.to_vec(), absender));
    }

    /// Entnimmt alle bisher gesendeten Datagramme
    pub fn gesendet_entnehmen(&self) -> Vec<(Bytes, SocketAddr)> {
        std::mem::take(&mut *self.gesendet.lock())
    }

    pub fn gesendet_anzahl(&self) -> usize {
        self.gesendet.lock().len()
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl Transport for AufzeichnenderTransport {
    fn senden(&self, daten: Bytes, ziel: SocketAddr) {
        self.gesendet.lock().push((daten, ziel));
    }

    async fn empfangen(&self, buf: &mut [u8], wartezeit: Duration) -> Option<(usize, SocketAddr)> {
        let naechstes = self.eingang.lock().pop_front();
        match naechstes {
            Some((daten, absender)) => {
                let n = daten.len().min(buf.len());
                buf[..n].copy_from_slice(&daten[..n]);
                Some((n, absender))
            }
            None => {
                tokio::time::sleep(wartezeit).await;
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
