//! Gatekeeper – entscheidet ueber Link und Senderecht
//!
//! Die Adapter fragen den Gatekeeper vor dem Anlegen eines Clients
//! (`darf_verbinden`) und vor dem Oeffnen eines Streams (`darf_senden`).

use reflektor_core::{Callsign, Protocol};
use std::net::SocketAddr;

/// Autorisierungs-Schnittstelle fuer die Protokoll-Adapter
pub trait Gatekeeper: Send + Sync {
    /// Darf sich `rufzeichen` von `adresse` aus verbinden?
    fn darf_verbinden(&self, rufzeichen: &Callsign, adresse: SocketAddr, protokoll: Protocol) -> bool;

    /// Darf `rufzeichen` auf `modul` senden?
    fn darf_senden(
        &self,
        rufzeichen: &Callsign,
        adresse: SocketAddr,
        protokoll: Protocol,
        modul: char,
    ) -> bool;
}

/// Gatekeeper auf Basis von Rufzeichen-Mustern (Wildcard `*`)
///
/// - Eine leere Whitelist erlaubt alle Rufzeichen
/// - Die Blacklist hat Vorrang vor der Whitelist
#[derive(Debug, Clone, Default)]
pub struct ListGatekeeper {
    whitelist: Vec<Callsign>,
    blacklist: Vec<Callsign>,
}

impl ListGatekeeper {
    pub fn neu<S: AsRef<str>>(whitelist: &[S], blacklist: &[S]) -> Self {
        let muster = |liste: &[S]| {
            liste
                .iter()
                .map(|s| Callsign::from(s.as_ref().trim()))
                .collect::<Vec<_>>()
        };
        Self {
            whitelist: muster(whitelist),
            blacklist: muster(blacklist),
        }
    }

    /// Gatekeeper ohne Einschraenkungen
    pub fn offen() -> Self {
        Self::default()
    }

    fn ist_erlaubt(&self, rufzeichen: &Callsign) -> bool {
        // Modul-Zeichen ignorieren: "DL1ABC B" wird wie "DL1ABC" behandelt
        let mut basis = *rufzeichen;
        basis.modul_setzen(' ');

        if self.blacklist.iter().any(|m| basis.passt_auf(m)) {
            return false;
        }
        self.whitelist.is_empty() || self.whitelist.iter().any(|m| basis.passt_auf(m))
    }
}

impl Gatekeeper for ListGatekeeper {
    fn darf_verbinden(&self, rufzeichen: &Callsign, adresse: SocketAddr, protokoll: Protocol) -> bool {
        let erlaubt = rufzeichen.ist_gueltig() && self.ist_erlaubt(rufzeichen);
        if !erlaubt {
            tracing::warn!(
                rufzeichen = %rufzeichen,
                adresse = %adresse,
                protokoll = %protokoll,
                "Link abgelehnt"
            );
        }
        erlaubt
    }

    fn darf_senden(
        &self,
        rufzeichen: &Callsign,
        adresse: SocketAddr,
        protokoll: Protocol,
        modul: char,
    ) -> bool {
        let erlaubt = self.ist_erlaubt(rufzeichen);
        if !erlaubt {
            tracing::warn!(
                rufzeichen = %rufzeichen,
                adresse = %adresse,
                protokoll = %protokoll,
                modul = %modul,
                "Senden abgelehnt"
            );
        }
        erlaubt
    }
}
