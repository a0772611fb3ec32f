//! Rufzeichen (D-STAR Callsign)
//!
//! Ein Rufzeichen besteht aus 8 Zeichen und einem 4-Zeichen-Suffix.
//! Das achte Zeichen ist das Modul (z.B. `REF001 C` -> Modul `C`).
//!
//! ```text
//! Index   0 1 2 3 4 5 6 7
//! Zeichen R E F 0 0 1 _ C
//!                       ^ Modul
//! ```

use std::fmt;

/// Laenge eines Rufzeichens inklusive Modul-Zeichen
pub const RUFZEICHEN_LAENGE: usize = 8;

/// Laenge des Rufzeichen-Suffixes (MY2)
pub const SUFFIX_LAENGE: usize = 4;

/// Festlaengen-Rufzeichen mit Modul und Suffix
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Callsign {
    zeichen: [u8; RUFZEICHEN_LAENGE],
    suffix: [u8; SUFFIX_LAENGE],
}

impl Callsign {
    /// Leeres Rufzeichen (nur Leerzeichen)
    pub const fn leer() -> Self {
        Self {
            zeichen: [b' '; RUFZEICHEN_LAENGE],
            suffix: [b' '; SUFFIX_LAENGE],
        }
    }

    /// Uebernimmt bis zu 8 Bytes; fehlende Zeichen werden mit Leerzeichen aufgefuellt
    pub fn aus_bytes(bytes: &[u8]) -> Self {
        let mut cs = Self::leer();
        let n = bytes.len().min(RUFZEICHEN_LAENGE);
        cs.zeichen[..n].copy_from_slice(&bytes[..n]);
        cs
    }

    /// Wie `aus_bytes`, zusaetzlich mit Suffix
    pub fn mit_suffix(bytes: &[u8], suffix: &[u8]) -> Self {
        let mut cs = Self::aus_bytes(bytes);
        let n = suffix.len().min(SUFFIX_LAENGE);
        cs.suffix[..n].copy_from_slice(&suffix[..n]);
        cs
    }

    /// Rohbytes des Rufzeichens (inklusive Modul)
    pub fn als_bytes(&self) -> &[u8; RUFZEICHEN_LAENGE] {
        &self.zeichen
    }

    /// Rohbytes des Suffixes
    pub fn suffix(&self) -> &[u8; SUFFIX_LAENGE] {
        &self.suffix
    }

    /// Modul-Zeichen (Index 7)
    pub fn modul(&self) -> char {
        self.zeichen[RUFZEICHEN_LAENGE - 1] as char
    }

    pub fn modul_setzen(&mut self, modul: char) {
        if modul.is_ascii() {
            self.zeichen[RUFZEICHEN_LAENGE - 1] = modul as u8;
        }
    }

    /// Prueft das Rufzeichen auf gueltige Zeichen
    ///
    /// - Die ersten 3 Zeichen sind Grossbuchstaben oder Ziffern, aber nicht nur Ziffern
    /// - Die restlichen Zeichen sind Grossbuchstaben, Ziffern oder Leerzeichen
    /// - Das Modul ist ein Grossbuchstabe oder Leerzeichen
    /// - Das Suffix besteht aus Grossbuchstaben, Ziffern oder Leerzeichen
    pub fn ist_gueltig(&self) -> bool {
        let praefix = &self.zeichen[..3];
        let praefix_ok = praefix.iter().all(|c| ist_alnum(*c))
            && praefix.iter().filter(|c| c.is_ascii_digit()).count() < 3;

        let rest_ok = self.zeichen[3..RUFZEICHEN_LAENGE - 1]
            .iter()
            .all(|c| ist_alnum(*c) || *c == b' ');

        let modul = self.zeichen[RUFZEICHEN_LAENGE - 1];
        let modul_ok = modul.is_ascii_uppercase() || modul == b' ';

        let suffix_ok = self.suffix.iter().all(|c| ist_alnum(*c) || *c == b' ');

        praefix_ok && rest_ok && modul_ok && suffix_ok
    }

    /// Vergleich mit Wildcard `*` (auf einer der beiden Seiten)
    ///
    /// Zeichen werden bis zum ersten `*` verglichen, danach ist alles gleich.
    pub fn passt_auf(&self, muster: &Callsign) -> bool {
        for (a, b) in self.zeichen.iter().zip(muster.zeichen.iter()) {
            if *a == b'*' || *b == b'*' {
                return true;
            }
            if a != b {
                return false;
            }
        }
        true
    }

    /// Ueberschreibt Zeichen ab `offset` (z.B. `REF` -> `XRF`)
    pub fn patchen(&mut self, offset: usize, bytes: &[u8]) {
        if offset >= RUFZEICHEN_LAENGE {
            return;
        }
        let n = bytes.len().min(RUFZEICHEN_LAENGE - offset);
        self.zeichen[offset..offset + n].copy_from_slice(&bytes[..n]);
    }
}

impl Default for Callsign {
    fn default() -> Self {
        Self::leer()
    }
}

impl From<&str> for Callsign {
    fn from(s: &str) -> Self {
        Self::aus_bytes(s.as_bytes())
    }
}

impl fmt::Display for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = String::from_utf8_lossy(&self.zeichen);
        f.write_str(text.trim_end())
    }
}

impl fmt::Debug for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Callsign({:?}/{:?})",
            String::from_utf8_lossy(&self.zeichen),
            String::from_utf8_lossy(&self.suffix)
        )
    }
}

fn ist_alnum(c: u8) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit()
}
