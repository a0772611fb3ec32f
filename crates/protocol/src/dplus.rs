//! DPlus Wire-Format (UDP)
//!
//! Klassifiziert eingehende Datagramme und kodiert DV-Pakete in das
//! DPlus-Format. Alle Pakettypen haben unterschiedliche feste Laengen,
//! die Klassifizierung erfolgt daher zuerst ueber die Laenge.
//!
//! ## Paketformate
//!
//! ```text
//! Paket          Laenge  Aufbau
//! -------------  ------  --------------------------------------------------
//! Connect           5    05 00 18 00 01            (Ack = Echo)
//! Disconnect        5    05 00 18 00 00
//! Keepalive         3    03 60 00                  (beide Richtungen)
//! Login            28    1C C0 04 00 + Rufzeichen(8) + 16 reserviert
//! Login-Ack         8    08 C0 04 00 'O' 'K' 'R' 'W'
//! Login-Nack        8    08 C0 04 00 'B' 'U' 'S' 'Y'
//! Header           58    Tag(14) + StreamId(2, LE) + 0x80 + D-STAR Header(41)
//! Frame            29    Tag(14) + StreamId(2, LE) + Seq%21 + AMBE(9) + Daten(3)
//! Last-Frame       32    Tag(14) + StreamId(2, LE) + (Seq%21)|0x40 + Trailer(15)
//! ```
//!
//! ## D-STAR Header (41 Bytes ab Offset 17)
//!
//! ```text
//! Offset  Len  Feld
//!  0       3   Flags 1..3
//!  3       8   RPT2
//! 11       8   RPT1
//! 19       8   UR
//! 27       8   MY
//! 35       4   MY-Suffix
//! 39       2   CRC (LE)
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use reflektor_core::callsign::{RUFZEICHEN_LAENGE, SUFFIX_LAENGE};
use reflektor_core::Callsign;

use crate::dv::{
    DvFramePacket, DvHeaderPacket, DvLastFramePacket, DvPacket, AMBE_LAENGE, DVDATA_LAENGE,
};
use crate::error::CodecError;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-UDP-Port fuer DPlus
pub const DPLUS_PORT: u16 = 20001;

/// Sequenznummern laufen auf der Leitung modulo 21 (ein Superframe)
pub const SEQUENZ_MODULO: u8 = 21;

/// Markierungsbit fuer den letzten Frame
pub const LAST_FRAME_BIT: u8 = 0x40;

pub const CONNECT: [u8; 5] = [0x05, 0x00, 0x18, 0x00, 0x01];
pub const DISCONNECT: [u8; 5] = [0x05, 0x00, 0x18, 0x00, 0x00];
pub const KEEPALIVE: [u8; 3] = [0x03, 0x60, 0x00];
pub const LOGIN_TAG: [u8; 4] = [0x1C, 0xC0, 0x04, 0x00];
pub const LOGIN_ACK: [u8; 8] = [0x08, 0xC0, 0x04, 0x00, b'O', b'K', b'R', b'W'];
pub const LOGIN_NACK: [u8; 8] = [0x08, 0xC0, 0x04, 0x00, b'B', b'U', b'S', b'Y'];

pub const HEADER_TAG: [u8; 14] = [
    0x3A, 0x80, b'D', b'S', b'V', b'T', 0x10, 0x00, 0x00, 0x00, 0x20, 0x00, 0x01, 0x02,
];
pub const FRAME_TAG: [u8; 14] = [
    0x1D, 0x80, b'D', b'S', b'V', b'T', 0x20, 0x00, 0x00, 0x00, 0x20, 0x00, 0x01, 0x02,
];
pub const LAST_FRAME_TAG: [u8; 14] = [
    0x20, 0x80, b'D', b'S', b'V', b'T', 0x20, 0x00, 0x81, 0x00, 0x20, 0x00, 0x01, 0x02,
];
pub const LAST_FRAME_TRAILER: [u8; 15] = [
    0x55, 0xC8, 0x7A, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x25, 0x1A, 0xC6,
];

pub const LOGIN_LAENGE: usize = 28;
pub const HEADER_LAENGE: usize = 58;
pub const FRAME_LAENGE: usize = 29;
pub const LAST_FRAME_LAENGE: usize = 32;

/// Laenge der D-STAR Header-Struktur
pub const DSTAR_HEADER_LAENGE: usize = 41;

const STREAM_ID_OFFSET: usize = 14;
const SEQUENZ_OFFSET: usize = 16;
const NUTZDATEN_OFFSET: usize = 17;
const DSVT: &[u8; 4] = b"DSVT";

// ---------------------------------------------------------------------------
// DplusPaket
// ---------------------------------------------------------------------------

/// Ergebnis der Klassifizierung eines eingehenden Datagramms
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DplusPaket {
    Connect,
    Login(Callsign),
    Disconnect,
    Keepalive,
    Header(DvHeaderPacket),
    Frame(DvFramePacket),
    LastFrame(DvLastFramePacket),
}

/// Klassifiziert und dekodiert ein Datagramm
///
/// # Fehler
/// `CodecError::Unbekannt` fuer Datagramme ohne passende Form,
/// sonst der Fehler des jeweiligen Dekoders.
pub fn dekodieren(daten: &[u8]) -> Result<DplusPaket, CodecError> {
    match daten.len() {
        FRAME_LAENGE => frame_dekodieren(daten).map(DplusPaket::Frame),
        HEADER_LAENGE => header_dekodieren(daten).map(DplusPaket::Header),
        LAST_FRAME_LAENGE => last_frame_dekodieren(daten).map(DplusPaket::LastFrame),
        5 if ist_connect(daten) => Ok(DplusPaket::Connect),
        5 if ist_disconnect(daten) => Ok(DplusPaket::Disconnect),
        LOGIN_LAENGE => login_dekodieren(daten).map(DplusPaket::Login),
        3 if ist_keepalive(daten) => Ok(DplusPaket::Keepalive),
        laenge => Err(CodecError::Unbekannt { laenge }),
    }
}

// ---------------------------------------------------------------------------
// Dekodierung
// ---------------------------------------------------------------------------

pub fn ist_connect(daten: &[u8]) -> bool {
    daten == CONNECT
}

pub fn ist_disconnect(daten: &[u8]) -> bool {
    daten == DISCONNECT
}

pub fn ist_keepalive(daten: &[u8]) -> bool {
    daten == KEEPALIVE
}

/// Dekodiert eine Login-Anfrage und liefert das Rufzeichen
pub fn login_dekodieren(daten: &[u8]) -> Result<Callsign, CodecError> {
    laenge_pruefen(daten, LOGIN_LAENGE)?;
    kennung_pruefen(daten, 0, &LOGIN_TAG)?;

    let rufzeichen = Callsign::aus_bytes(&daten[4..4 + RUFZEICHEN_LAENGE]);
    if !rufzeichen.ist_gueltig() {
        return Err(CodecError::UngueltigesRufzeichen(rufzeichen.to_string()));
    }
    Ok(rufzeichen)
}

/// Dekodiert einen Header (58 Bytes)
///
/// Geprueft werden nur die Bytes 0..2, 2..6, 6 und 10 des Tags; der Rest des
/// Tags variiert zwischen Implementierungen.
pub fn header_dekodieren(daten: &[u8]) -> Result<DvHeaderPacket, CodecError> {
    laenge_pruefen(daten, HEADER_LAENGE)?;
    dsvt_tag_pruefen(daten, &HEADER_TAG)?;

    let stream_id = stream_id_lesen(daten);
    let h = &daten[NUTZDATEN_OFFSET..NUTZDATEN_OFFSET + DSTAR_HEADER_LAENGE];

    let rufzeichen = |offset: usize| Callsign::aus_bytes(&h[offset..offset + RUFZEICHEN_LAENGE]);
    let header = DvHeaderPacket {
        stream_id,
        flags: [h[0], h[1], h[2]],
        rpt2: rufzeichen(3),
        rpt1: rufzeichen(11),
        ur: rufzeichen(19),
        my: Callsign::mit_suffix(&h[27..35], &h[35..35 + SUFFIX_LAENGE]),
        crc: u16::from_le_bytes([h[39], h[40]]),
    };

    if !header.ist_gueltig() {
        return Err(CodecError::UngueltigesRufzeichen(format!(
            "my={} rpt1={} rpt2={}",
            header.my, header.rpt1, header.rpt2
        )));
    }
    Ok(header)
}

/// Dekodiert einen Sprach-Frame (29 Bytes)
pub fn frame_dekodieren(daten: &[u8]) -> Result<DvFramePacket, CodecError> {
    laenge_pruefen(daten, FRAME_LAENGE)?;
    dsvt_tag_pruefen(daten, &FRAME_TAG)?;

    let (ambe, dv_daten) = nutzdaten_lesen(daten);
    Ok(DvFramePacket {
        stream_id: stream_id_lesen(daten),
        sequenz: daten[SEQUENZ_OFFSET],
        ambe,
        dv_daten,
    })
}

/// Dekodiert einen Last-Frame (32 Bytes)
///
/// Das Markierungsbit `0x40` wird aus der Sequenz entfernt.
pub fn last_frame_dekodieren(daten: &[u8]) -> Result<DvLastFramePacket, CodecError> {
    laenge_pruefen(daten, LAST_FRAME_LAENGE)?;
    dsvt_tag_pruefen(daten, &LAST_FRAME_TAG)?;

    let (ambe, dv_daten) = nutzdaten_lesen(daten);
    Ok(DvLastFramePacket {
        stream_id: stream_id_lesen(daten),
        sequenz: daten[SEQUENZ_OFFSET] & !LAST_FRAME_BIT,
        ambe,
        dv_daten,
    })
}

// ---------------------------------------------------------------------------
// Kodierung
// ---------------------------------------------------------------------------

/// Kodiert ein protokollneutrales DV-Paket
///
/// # Fehler
/// `CodecError::UngueltigesRufzeichen` wenn ein Header die Rufzeichen-Pruefung
/// nicht besteht. Fuer intern erzeugte Pakete deutet das auf einen Fehler im
/// Erzeuger hin.
pub fn kodieren(paket: &DvPacket) -> Result<Bytes, CodecError> {
    match paket {
        DvPacket::Header(h) => header_kodieren(h),
        DvPacket::Frame(f) => Ok(frame_kodieren(f)),
        DvPacket::LastFrame(f) => Ok(last_frame_kodieren(f)),
    }
}

pub fn header_kodieren(header: &DvHeaderPacket) -> Result<Bytes, CodecError> {
    if !header.ist_gueltig() {
        return Err(CodecError::UngueltigesRufzeichen(format!(
            "my={} rpt1={} rpt2={}",
            header.my, header.rpt1, header.rpt2
        )));
    }

    let mut buf = BytesMut::with_capacity(HEADER_LAENGE);
    buf.put_slice(&HEADER_TAG);
    buf.put_u16_le(header.stream_id);
    buf.put_u8(0x80);
    buf.put_slice(&header.flags);
    buf.put_slice(header.rpt2.als_bytes());
    buf.put_slice(header.rpt1.als_bytes());
    buf.put_slice(header.ur.als_bytes());
    buf.put_slice(header.my.als_bytes());
    buf.put_slice(header.my.suffix());
    buf.put_u16_le(header.crc);
    Ok(buf.freeze())
}

pub fn frame_kodieren(frame: &DvFramePacket) -> Bytes {
    let mut buf = BytesMut::with_capacity(FRAME_LAENGE);
    buf.put_slice(&FRAME_TAG);
    buf.put_u16_le(frame.stream_id);
    buf.put_u8(frame.sequenz % SEQUENZ_MODULO);
    buf.put_slice(&frame.ambe);
    buf.put_slice(&frame.dv_daten);
    buf.freeze()
}

pub fn last_frame_kodieren(frame: &DvLastFramePacket) -> Bytes {
    let mut buf = BytesMut::with_capacity(LAST_FRAME_LAENGE);
    buf.put_slice(&LAST_FRAME_TAG);
    buf.put_u16_le(frame.stream_id);
    buf.put_u8((frame.sequenz % SEQUENZ_MODULO) | LAST_FRAME_BIT);
    buf.put_slice(&LAST_FRAME_TRAILER);
    buf.freeze()
}

pub fn keepalive_kodieren() -> Bytes {
    Bytes::from_static(&KEEPALIVE)
}

pub fn disconnect_kodieren() -> Bytes {
    Bytes::from_static(&DISCONNECT)
}

pub fn login_ack_kodieren() -> Bytes {
    Bytes::from_static(&LOGIN_ACK)
}

pub fn login_nack_kodieren() -> Bytes {
    Bytes::from_static(&LOGIN_NACK)
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

fn laenge_pruefen(daten: &[u8], erwartet: usize) -> Result<(), CodecError> {
    if daten.len() != erwartet {
        return Err(CodecError::FalscheLaenge {
            laenge: daten.len(),
            erwartet,
        });
    }
    Ok(())
}

fn kennung_pruefen(daten: &[u8], offset: usize, kennung: &[u8]) -> Result<(), CodecError> {
    match daten.get(offset..offset + kennung.len()) {
        Some(teil) if teil == kennung => Ok(()),
        _ => Err(CodecError::FalscheKennung { offset }),
    }
}

/// Prueft Marker (0..2), "DSVT" (2..6) sowie die Bytes 6 und 10
fn dsvt_tag_pruefen(daten: &[u8], tag: &[u8; 14]) -> Result<(), CodecError> {
    kennung_pruefen(daten, 0, &tag[0..2])?;
    kennung_pruefen(daten, 2, DSVT)?;
    kennung_pruefen(daten, 6, &tag[6..7])?;
    kennung_pruefen(daten, 10, &tag[10..11])
}

fn stream_id_lesen(daten: &[u8]) -> u16 {
    u16::from_le_bytes([daten[STREAM_ID_OFFSET], daten[STREAM_ID_OFFSET + 1]])
}

fn nutzdaten_lesen(daten: &[u8]) -> ([u8; AMBE_LAENGE], [u8; DVDATA_LAENGE]) {
    let mut ambe = [0u8; AMBE_LAENGE];
    let mut dv_daten = [0u8; DVDATA_LAENGE];
    let start = NUTZDATEN_OFFSET;
    ambe.copy_from_slice(&daten[start..start + AMBE_LAENGE]);
    dv_daten.copy_from_slice(&daten[start + AMBE_LAENGE..start + AMBE_LAENGE + DVDATA_LAENGE]);
    (ambe, dv_daten)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
