//! Client-Verzeichnis – alle verbundenen Clients aller Protokolle
//!
//! Das Verzeichnis wird von allen Protokoll-Adaptern gemeinsam genutzt und
//! ist durch einen `parking_lot::Mutex` geschuetzt. Zugriff erfolgt immer
//! ueber `ClientDirectory::sperren()`; der Guard gibt die Sperre beim Drop
//! auf jedem Pfad wieder frei.
//!
//! Mehrere Clients duerfen dieselbe Adresse und dasselbe Protokoll haben
//! (z.B. mehrere Module hinter einem Gateway).

use parking_lot::{Mutex, MutexGuard};
use reflektor_core::{Callsign, ClientId, Protocol};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client-Familie fuer die Header-Anpassung
///
/// Solange einem Client kein Modul zugeordnet ist, gilt seine Familie als
/// unbestimmt, auch wenn er bereits als Dongle markiert wurde.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientFamilie {
    Unbestimmt,
    Dongle,
    Nativ,
}

/// Ein verbundener Client
#[derive(Debug, Clone)]
pub struct Client {
    pub id: ClientId,
    pub protokoll: Protocol,
    pub rufzeichen: Callsign,
    pub adresse: SocketAddr,
    modul: Option<char>,
    dextra_dongle: bool,
    /// Modul, auf dem der Client gerade selbst sendet
    master_modul: Option<char>,
    letztes_lebenszeichen: Instant,
}

impl Client {
    pub fn neu(rufzeichen: Callsign, adresse: SocketAddr, protokoll: Protocol) -> Self {
        Self {
            id: ClientId::new(),
            protokoll,
            rufzeichen,
            adresse,
            modul: None,
            dextra_dongle: false,
            master_modul: None,
            letztes_lebenszeichen: Instant::now(),
        }
    }

    /// Setzt die Lebenszeichen-Frist zurueck
    pub fn lebenszeichen(&mut self) {
        self.letztes_lebenszeichen = Instant::now();
    }

    /// Prueft ob seit `timeout` kein Lebenszeichen kam
    pub fn ist_inaktiv(&self, timeout: Duration) -> bool {
        self.letztes_lebenszeichen.elapsed() > timeout
    }

    pub fn modul(&self) -> Option<char> {
        self.modul
    }

    pub fn hat_modul(&self) -> bool {
        self.modul.is_some()
    }

    /// Ordnet ein Modul zu; ein bereits gesetztes Modul bleibt erhalten
    ///
    /// Nur Grossbuchstaben sind Module. Ein Leerzeichen (z.B. aus RPT1 eines
    /// Gateways ohne Modul) laesst den Client ohne Modul.
    pub fn modul_setzen(&mut self, modul: char) {
        if self.modul.is_none() && modul.is_ascii_uppercase() {
            self.modul = Some(modul);
        }
    }

    /// Rufzeichen mit dem zugeordneten Modul an Stelle 8
    pub fn rufzeichen_mit_modul(&self) -> Callsign {
        let mut rufzeichen = self.rufzeichen;
        if let Some(modul) = self.modul {
            rufzeichen.modul_setzen(modul);
        }
        rufzeichen
    }

    pub fn ist_dextra_dongle(&self) -> bool {
        self.dextra_dongle
    }

    pub fn dextra_dongle_setzen(&mut self) {
        self.dextra_dongle = true;
    }

    pub fn ist_master(&self) -> bool {
        self.master_modul.is_some()
    }

    pub fn master_modul(&self) -> Option<char> {
        self.master_modul
    }

    pub fn master_setzen(&mut self, modul: Option<char>) {
        self.master_modul = modul;
    }

    pub fn familie(&self) -> ClientFamilie {
        match (self.modul, self.dextra_dongle) {
            (None, _) => ClientFamilie::Unbestimmt,
            (Some(_), true) => ClientFamilie::Dongle,
            (Some(_), false) => ClientFamilie::Nativ,
        }
    }
}

// ---------------------------------------------------------------------------
// Clients (gesperrter Inhalt)
// ---------------------------------------------------------------------------

/// Inhalt des Verzeichnisses; nur ueber den Guard erreichbar
#[derive(Debug, Default)]
pub struct Clients {
    liste: Vec<Client>,
}

impl Clients {
    /// Fuegt einen Client hinzu
    ///
    /// Existiert bereits ein Client mit gleichem Rufzeichen, gleicher Adresse
    /// und gleichem Protokoll, wird nur dessen Lebenszeichen erneuert.
    pub fn hinzufuegen(&mut self, client: Client) -> ClientId {
        if let Some(vorhanden) = self.liste.iter_mut().find(|c| {
            c.rufzeichen == client.rufzeichen
                && c.adresse == client.adresse
                && c.protokoll == client.protokoll
        }) {
            vorhanden.lebenszeichen();
            return vorhanden.id;
        }

        tracing::info!(
            rufzeichen = %client.rufzeichen,
            adresse = %client.adresse,
            protokoll = %client.protokoll,
            "Client verbunden"
        );
        let id = client.id;
        self.liste.push(client);
        id
    }

    pub fn entfernen(&mut self, id: ClientId) -> Option<Client> {
        let pos = self.liste.iter().position(|c| c.id == id)?;
        let client = self.liste.remove(pos);
        tracing::info!(
            rufzeichen = %client.rufzeichen,
            adresse = %client.adresse,
            protokoll = %client.protokoll,
            "Client entfernt"
        );
        Some(client)
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.liste.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.liste.iter_mut().find(|c| c.id == id)
    }

    /// Erster Client mit dieser Adresse und diesem Protokoll
    pub fn finden(&self, adresse: SocketAddr, protokoll: Protocol) -> Option<&Client> {
        self.liste
            .iter()
            .find(|c| c.adresse == adresse && c.protokoll == protokoll)
    }

    pub fn finden_mut(&mut self, adresse: SocketAddr, protokoll: Protocol) -> Option<&mut Client> {
        self.liste
            .iter_mut()
            .find(|c| c.adresse == adresse && c.protokoll == protokoll)
    }

    pub fn nach_protokoll(&self, protokoll: Protocol) -> impl Iterator<Item = &Client> {
        self.liste.iter().filter(move |c| c.protokoll == protokoll)
    }

    pub fn nach_protokoll_mut(&mut self, protokoll: Protocol) -> impl Iterator<Item = &mut Client> {
        self.liste.iter_mut().filter(move |c| c.protokoll == protokoll)
    }

    /// Alle Clients mit dieser Adresse und diesem Protokoll
    pub fn nach_adresse_mut(
        &mut self,
        adresse: SocketAddr,
        protokoll: Protocol,
    ) -> impl Iterator<Item = &mut Client> {
        self.liste
            .iter_mut()
            .filter(move |c| c.adresse == adresse && c.protokoll == protokoll)
    }

    pub fn anzahl(&self) -> usize {
        self.liste.len()
    }

    pub fn ist_leer(&self) -> bool {
        self.liste.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ClientDirectory
// ---------------------------------------------------------------------------

/// Gemeinsames, `Clone`-faehiges Client-Verzeichnis (innerer Arc)
#[derive(Clone, Default)]
pub struct ClientDirectory {
    inner: Arc<Mutex<Clients>>,
}

impl ClientDirectory {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Sperrt das Verzeichnis bis zum Drop des Guards
    ///
    /// Der Guard darf nicht ueber ein `.await` gehalten werden.
    pub fn sperren(&self) -> MutexGuard<'_, Clients> {
        self.inner.lock()
    }

    pub fn anzahl(&self) -> usize {
        self.inner.lock().anzahl()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
