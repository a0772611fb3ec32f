//! Protokollneutrale DV-Pakete
//!
//! Diese Typen fliessen zwischen den Protokoll-Adaptern und dem Relay-Kern.
//! Jeder Adapter kodiert sie in sein eigenes Wire-Format.

use reflektor_core::Callsign;

/// Laenge der AMBE-Sprachdaten pro Frame
pub const AMBE_LAENGE: usize = 9;

/// Laenge der Slow-Data pro Frame
pub const DVDATA_LAENGE: usize = 3;

// ---------------------------------------------------------------------------
// DvHeaderPacket
// ---------------------------------------------------------------------------

/// D-STAR Header eines Streams
///
/// Beschreibt Absender (MY), Ziel (UR) und die beiden Repeater-Rufzeichen.
/// Das Modul-Zeichen von RPT2 bestimmt das Zielmodul im Reflektor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvHeaderPacket {
    pub stream_id: u16,
    /// D-STAR Flags 1..3
    pub flags: [u8; 3],
    pub rpt2: Callsign,
    pub rpt1: Callsign,
    pub ur: Callsign,
    /// Absender inklusive Suffix
    pub my: Callsign,
    pub crc: u16,
}

impl DvHeaderPacket {
    /// Erstellt einen Header mit leeren Flags und CRC
    pub fn neu(stream_id: u16, my: Callsign, ur: Callsign, rpt1: Callsign, rpt2: Callsign) -> Self {
        Self {
            stream_id,
            flags: [0; 3],
            rpt2,
            rpt1,
            ur,
            my,
            crc: 0,
        }
    }

    /// RPT1, RPT2 und MY muessen gueltige Rufzeichen sein
    pub fn ist_gueltig(&self) -> bool {
        self.rpt1.ist_gueltig() && self.rpt2.ist_gueltig() && self.my.ist_gueltig()
    }

    /// Zielmodul (Modul-Zeichen von RPT2)
    pub fn rpt2_modul(&self) -> char {
        self.rpt2.modul()
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Sprach-Frame innerhalb eines Streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvFramePacket {
    pub stream_id: u16,
    /// Logische Sequenznummer (auf der Leitung modulo 21)
    pub sequenz: u8,
    pub ambe: [u8; AMBE_LAENGE],
    pub dv_daten: [u8; DVDATA_LAENGE],
}

impl DvFramePacket {
    pub fn neu(stream_id: u16, sequenz: u8, ambe: [u8; AMBE_LAENGE], dv_daten: [u8; DVDATA_LAENGE]) -> Self {
        Self {
            stream_id,
            sequenz,
            ambe,
            dv_daten,
        }
    }
}

/// Abschliessender Frame eines Streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvLastFramePacket {
    pub stream_id: u16,
    pub sequenz: u8,
    pub ambe: [u8; AMBE_LAENGE],
    pub dv_daten: [u8; DVDATA_LAENGE],
}

impl DvLastFramePacket {
    pub fn neu(stream_id: u16, sequenz: u8) -> Self {
        Self {
            stream_id,
            sequenz,
            ambe: [0; AMBE_LAENGE],
            dv_daten: [0; DVDATA_LAENGE],
        }
    }
}

// ---------------------------------------------------------------------------
// DvPacket
// ---------------------------------------------------------------------------

/// Geschlossene Menge aller DV-Pakettypen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DvPacket {
    Header(DvHeaderPacket),
    Frame(DvFramePacket),
    LastFrame(DvLastFramePacket),
}

impl DvPacket {
    pub fn stream_id(&self) -> u16 {
        match self {
            Self::Header(h) => h.stream_id,
            Self::Frame(f) => f.stream_id,
            Self::LastFrame(f) => f.stream_id,
        }
    }

    pub fn ist_header(&self) -> bool {
        matches!(self, Self::Header(_))
    }
}

/// Eintrag in der Ausgangs-Queue eines Adapters
///
/// `modul` ist das Modul, auf dem der Stream laeuft. Der Kern setzt es beim
/// Einreihen; der Adapter verlaesst sich darauf (Modul-Cache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub modul: char,
    pub paket: DvPacket,
}

impl QueueEntry {
    pub fn neu(modul: char, paket: DvPacket) -> Self {
        Self { modul, paket }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> DvHeaderPacket {
        DvHeaderPacket::neu(
            0x1234,
            Callsign::from("DL1ABC"),
            Callsign::from("CQCQCQ"),
            Callsign::from("DL1ABC B"),
            Callsign::from("REF001 C"),
        )
    }

    #[test]
    fn header_gueltigkeit() {
        assert!(header().ist_gueltig());

        let mut h = header();
        h.my = Callsign::from("123");
        assert!(!h.ist_gueltig());
    }

    #[test]
    fn header_ur_wird_nicht_geprueft() {
        let mut h = header();
        h.ur = Callsign::from("       U");
        assert!(h.ist_gueltig());
    }

    #[test]
    fn rpt2_modul() {
        assert_eq!(header().rpt2_modul(), 'C');
    }

    #[test]
    fn dv_packet_stream_id() {
        let p = DvPacket::Frame(DvFramePacket::neu(7, 1, [0; AMBE_LAENGE], [0; DVDATA_LAENGE]));
        assert_eq!(p.stream_id(), 7);
        assert!(!p.ist_header());
        assert!(DvPacket::Header(header()).ist_header());
    }
}
