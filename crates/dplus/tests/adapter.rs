//! Integrationstests fuer den DPlus-Adapter
//!
//! Der Adapter laeuft gegen einen aufzeichnenden Transport; der Relay-Kern
//! ist entweder ein zaehlender Mock oder der `LocalReflector`.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reflektor_core::{Callsign, Protocol, StreamHandle};
use reflektor_dplus::{DplusConfig, DplusProtocol};
use reflektor_protocol::dplus;
use reflektor_protocol::{DvFramePacket, DvHeaderPacket, DvLastFramePacket, DvPacket};
use reflektor_relay::{
    AufzeichnenderTransport, Client, ClientDirectory, ClientFamilie, ListGatekeeper,
    LocalReflector, PacketQueue, RelayCore,
};

// ---------------------------------------------------------------------------
// Hilfen
// ---------------------------------------------------------------------------

/// Relay-Kern, der nur zaehlt und aufzeichnet (Module A..D)
#[derive(Default)]
struct ZaehlenderKern {
    geoeffnet: AtomicUsize,
    generation: AtomicU64,
    offen: Mutex<HashSet<StreamHandle>>,
    eingespeist: Mutex<Vec<DvPacket>>,
    gehoert: Mutex<Vec<(Callsign, Callsign, Callsign)>>,
}

impl RelayCore for ZaehlenderKern {
    fn stream_oeffnen(&self, header: &DvHeaderPacket, client: &mut Client) -> Option<StreamHandle> {
        self.geoeffnet.fetch_add(1, Ordering::SeqCst);
        let handle = StreamHandle {
            stream_id: header.stream_id,
            generation: self.generation.fetch_add(1, Ordering::SeqCst),
        };
        client.master_setzen(Some(header.rpt2_modul()));
        self.offen.lock().insert(handle);
        Some(handle)
    }

    fn stream_schliessen(&self, handle: StreamHandle) {
        self.offen.lock().remove(&handle);
    }

    fn stream_offen(&self, handle: StreamHandle) -> bool {
        self.offen.lock().contains(&handle)
    }

    fn paket_einspeisen(&self, _handle: StreamHandle, paket: DvPacket) {
        self.eingespeist.lock().push(paket);
    }

    fn ist_gueltiges_modul(&self, modul: char) -> bool {
        ('A'..='D').contains(&modul)
    }

    fn modul_index(&self, modul: char) -> Option<usize> {
        self.ist_gueltiges_modul(modul)
            .then(|| reflektor_core::modul_index(modul))
            .flatten()
    }

    fn zuletzt_gehoert(&self, my: &Callsign, rpt1: &Callsign, rpt2: &Callsign) {
        self.gehoert.lock().push((*my, *rpt1, *rpt2));
    }
}

struct Aufbau {
    adapter: DplusProtocol,
    transport: Arc<AufzeichnenderTransport>,
    clients: ClientDirectory,
    kern: Arc<ZaehlenderKern>,
}

fn aufbau(gatekeeper: ListGatekeeper) -> Aufbau {
    let transport = Arc::new(AufzeichnenderTransport::neu());
    let clients = ClientDirectory::neu();
    let kern = Arc::new(ZaehlenderKern::default());
    let adapter = DplusProtocol::neu(
        DplusConfig::default(),
        transport.clone(),
        clients.clone(),
        Arc::new(gatekeeper),
        kern.clone(),
        PacketQueue::neu(),
    );
    Aufbau {
        adapter,
        transport,
        clients,
        kern,
    }
}

fn adresse(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)), port)
}

fn login(rufzeichen: &str) -> Vec<u8> {
    let mut daten = dplus::LOGIN_TAG.to_vec();
    daten.extend_from_slice(Callsign::from(rufzeichen).als_bytes());
    daten.resize(dplus::LOGIN_LAENGE, 0);
    daten
}

fn header(stream_id: u16, rpt1: &str, rpt2: &str) -> Vec<u8> {
    let header = DvHeaderPacket::neu(
        stream_id,
        Callsign::from("DL1ABC"),
        Callsign::from("CQCQCQ"),
        Callsign::from(rpt1),
        Callsign::from(rpt2),
    );
    dplus::header_kodieren(&header)
        .expect("Header muss kodierbar sein")
        .to_vec()
}

fn frame(stream_id: u16, sequenz: u8) -> Vec<u8> {
    dplus::frame_kodieren(&DvFramePacket::neu(stream_id, sequenz, [0x55; 9], [0x16; 3])).to_vec()
}

fn last_frame(stream_id: u16, sequenz: u8) -> Vec<u8> {
    dplus::last_frame_kodieren(&DvLastFramePacket::neu(stream_id, sequenz)).to_vec()
}

/// Meldet einen Client an und verwirft das Ack
fn angemeldet(a: &mut Aufbau, rufzeichen: &str, port: u16) {
    a.adapter.paket_verarbeiten(&login(rufzeichen), adresse(port));
    a.transport.gesendet_entnehmen();
}

// ---------------------------------------------------------------------------
// Steuerpakete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_gewaehrt_sendet_ack_und_legt_client_an() {
    let mut a = aufbau(ListGatekeeper::offen());
    a.adapter.paket_verarbeiten(&login("DL1ABC"), adresse(40001));

    let gesendet = a.transport.gesendet_entnehmen();
    assert_eq!(gesendet.len(), 1);
    assert_eq!(&gesendet[0].0[..], &dplus::LOGIN_ACK);
    assert_eq!(gesendet[0].1, adresse(40001));
    assert_eq!(a.clients.anzahl(), 1);
}

#[tokio::test]
async fn login_abgelehnt_sendet_nack_ohne_client() {
    let mut a = aufbau(ListGatekeeper::neu::<&str>(&[], &["DL1ABC"]));
    a.adapter.paket_verarbeiten(&login("DL1ABC"), adresse(40002));

    let gesendet = a.transport.gesendet_entnehmen();
    assert_eq!(gesendet.len(), 1);
    assert_eq!(&gesendet[0].0[..], &dplus::LOGIN_NACK);
    assert_eq!(a.clients.anzahl(), 0);
}

#[tokio::test]
async fn connect_wird_zurueckgesendet() {
    let mut a = aufbau(ListGatekeeper::offen());
    a.adapter.paket_verarbeiten(&dplus::CONNECT, adresse(40003));

    let gesendet = a.transport.gesendet_entnehmen();
    assert_eq!(gesendet.len(), 1);
    assert_eq!(&gesendet[0].0[..], &dplus::CONNECT);
    assert_eq!(gesendet[0].1, adresse(40003));
}

#[tokio::test]
async fn disconnect_entfernt_client_und_bestaetigt() {
    let mut a = aufbau(ListGatekeeper::offen());
    angemeldet(&mut a, "DL1ABC", 40004);

    a.adapter.paket_verarbeiten(&dplus::DISCONNECT, adresse(40004));
    assert_eq!(a.clients.anzahl(), 0);
    let gesendet = a.transport.gesendet_entnehmen();
    assert_eq!(gesendet.len(), 1);
    assert_eq!(&gesendet[0].0[..], &dplus::DISCONNECT);

    // Unbekannter Absender: keine Antwort
    a.adapter.paket_verarbeiten(&dplus::DISCONNECT, adresse(40005));
    assert_eq!(a.transport.gesendet_anzahl(), 0);
}

#[tokio::test]
async fn unbekannte_datagramme_werden_verworfen() {
    let mut a = aufbau(ListGatekeeper::offen());
    a.adapter.paket_verarbeiten(&[0xFF; 17], adresse(40006));
    a.adapter.paket_verarbeiten(&[], adresse(40006));
    assert_eq!(a.transport.gesendet_anzahl(), 0);
    assert_eq!(a.clients.anzahl(), 0);
}

// ---------------------------------------------------------------------------
// Header und Streams
// ---------------------------------------------------------------------------

#[tokio::test]
async fn header_fuer_ungueltiges_modul_oeffnet_nichts() {
    let mut a = aufbau(ListGatekeeper::offen());
    angemeldet(&mut a, "DL1ABC", 40010);

    a.adapter
        .paket_verarbeiten(&header(0x0A0A, "DL1ABC G", "REF001 Z"), adresse(40010));

    assert_eq!(a.kern.geoeffnet.load(Ordering::SeqCst), 0);
    assert!(a.kern.gehoert.lock().is_empty());
    assert!(a.adapter.streams().ist_leer());
}

#[tokio::test]
async fn header_oeffnet_stream_und_setzt_modul() {
    let mut a = aufbau(ListGatekeeper::offen());
    angemeldet(&mut a, "DL1ABC", 40011);

    a.adapter
        .paket_verarbeiten(&header(0x0B0B, "DL1ABC G", "REF001 B"), adresse(40011));

    assert_eq!(a.kern.geoeffnet.load(Ordering::SeqCst), 1);
    assert_eq!(a.adapter.streams().anzahl(), 1);

    let gehoert = a.kern.gehoert.lock().clone();
    assert_eq!(gehoert.len(), 1);
    assert_eq!(gehoert[0].0, Callsign::from("DL1ABC"));
    // RPT1 wird durch Rufzeichen und Modul des Clients ersetzt
    assert_eq!(gehoert[0].1, Callsign::from("DL1ABC G"));
    assert_eq!(gehoert[0].2, Callsign::from("REF001 B"));

    let clients = a.clients.sperren();
    let client = clients
        .finden(adresse(40011), Protocol::DPlus)
        .expect("Client vorhanden");
    assert_eq!(client.modul(), Some('G'));
    assert!(!client.ist_dextra_dongle());
    assert!(client.ist_master());
}

#[tokio::test]
async fn rpt1_ohne_modul_laesst_client_unbestimmt() {
    let mut a = aufbau(ListGatekeeper::offen());
    angemeldet(&mut a, "DL1ABC", 40019);

    a.adapter
        .paket_verarbeiten(&header(0x0B0C, "DL1ABC", "REF001 A"), adresse(40019));
    assert_eq!(a.kern.geoeffnet.load(Ordering::SeqCst), 1);

    let gehoert = a.kern.gehoert.lock().clone();
    assert_eq!(gehoert[0].1, Callsign::from("DL1ABC"));

    let clients = a.clients.sperren();
    let client = clients.finden(adresse(40019), Protocol::DPlus).unwrap();
    assert!(!client.hat_modul());
    assert_eq!(client.familie(), ClientFamilie::Unbestimmt);
}

#[tokio::test]
async fn wiederholter_header_oeffnet_keinen_zweiten_stream() {
    let mut a = aufbau(ListGatekeeper::offen());
    angemeldet(&mut a, "DL1ABC", 40012);

    let h = header(0x0C0C, "DL1ABC G", "REF001 A");
    a.adapter.paket_verarbeiten(&h, adresse(40012));
    a.adapter.paket_verarbeiten(&h, adresse(40012));

    assert_eq!(a.kern.geoeffnet.load(Ordering::SeqCst), 1);
    assert_eq!(a.kern.gehoert.lock().len(), 1);
}

#[tokio::test]
async fn header_von_unbekanntem_absender() {
    let mut a = aufbau(ListGatekeeper::offen());
    a.adapter
        .paket_verarbeiten(&header(0x0D0D, "DL1ABC G", "REF001 A"), adresse(40013));

    assert_eq!(a.kern.geoeffnet.load(Ordering::SeqCst), 0);
    assert_eq!(a.kern.gehoert.lock().len(), 1);
    assert!(a.adapter.streams().ist_leer());
}

#[tokio::test]
async fn header_ohne_senderecht_wird_verworfen() {
    let mut a = aufbau(ListGatekeeper::neu(&["F4*"], &[]));
    // Login mit anderem Rufzeichen ist erlaubt, MY im Header nicht
    angemeldet(&mut a, "F4ABC", 40014);

    a.adapter
        .paket_verarbeiten(&header(0x0E0E, "F4ABC  G", "REF001 A"), adresse(40014));

    assert_eq!(a.kern.geoeffnet.load(Ordering::SeqCst), 0);
    assert!(a.kern.gehoert.lock().is_empty());
}

#[tokio::test]
async fn xrf_rpt2_markiert_dongle() {
    let mut a = aufbau(ListGatekeeper::offen());
    angemeldet(&mut a, "DL1ABC", 40015);

    a.adapter
        .paket_verarbeiten(&header(0x0F0F, "DL1ABC G", "XRF001 C"), adresse(40015));

    let clients = a.clients.sperren();
    let client = clients.finden(adresse(40015), Protocol::DPlus).unwrap();
    assert!(client.ist_dextra_dongle());
}

#[tokio::test]
async fn frames_nur_vom_absender_des_streams() {
    let mut a = aufbau(ListGatekeeper::offen());
    angemeldet(&mut a, "DL1ABC", 40016);

    a.adapter
        .paket_verarbeiten(&header(0x1111, "DL1ABC G", "REF001 A"), adresse(40016));
    a.adapter.paket_verarbeiten(&frame(0x1111, 0), adresse(40016));
    a.adapter.paket_verarbeiten(&frame(0x1111, 1), adresse(40099));
    a.adapter.paket_verarbeiten(&frame(0x2222, 0), adresse(40016));

    assert_eq!(a.kern.eingespeist.lock().len(), 1);
}

#[tokio::test]
async fn last_frame_schliesst_stream() {
    let mut a = aufbau(ListGatekeeper::offen());
    angemeldet(&mut a, "DL1ABC", 40017);

    a.adapter
        .paket_verarbeiten(&header(0x3333, "DL1ABC G", "REF001 A"), adresse(40017));
    a.adapter.paket_verarbeiten(&frame(0x3333, 0), adresse(40017));
    a.adapter.paket_verarbeiten(&last_frame(0x3333, 1), adresse(40017));

    let eingespeist = a.kern.eingespeist.lock().clone();
    assert_eq!(eingespeist.len(), 2);
    assert!(matches!(eingespeist[1], DvPacket::LastFrame(_)));
    assert!(a.kern.offen.lock().is_empty());
    assert!(a.adapter.streams().ist_leer());

    // Weitere Frames des Streams werden ignoriert
    a.adapter.paket_verarbeiten(&frame(0x3333, 2), adresse(40017));
    assert_eq!(a.kern.eingespeist.lock().len(), 2);
}

#[tokio::test]
async fn vom_kern_geschlossener_stream_gilt_als_unbekannt() {
    let mut a = aufbau(ListGatekeeper::offen());
    angemeldet(&mut a, "DL1ABC", 40018);

    a.adapter
        .paket_verarbeiten(&header(0x4444, "DL1ABC G", "REF001 A"), adresse(40018));
    a.kern.offen.lock().clear();

    a.adapter.paket_verarbeiten(&frame(0x4444, 0), adresse(40018));
    assert!(a.kern.eingespeist.lock().is_empty());
    assert!(a.adapter.streams().ist_leer());
}

// ---------------------------------------------------------------------------
// Zeitverhalten
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn inaktiver_stream_wird_geschlossen() {
    let mut a = aufbau(ListGatekeeper::offen());
    angemeldet(&mut a, "DL1ABC", 40020);

    a.adapter
        .paket_verarbeiten(&header(0x5555, "DL1ABC G", "REF001 A"), adresse(40020));
    assert_eq!(a.kern.offen.lock().len(), 1);

    tokio::time::advance(Duration::from_millis(1700)).await;
    a.adapter.task().await;

    assert!(a.kern.offen.lock().is_empty());
    assert!(a.adapter.streams().ist_leer());
}

#[tokio::test(start_paused = true)]
async fn keepalive_timeout_entfernt_client() {
    let mut a = aufbau(ListGatekeeper::offen());
    angemeldet(&mut a, "DL1ABC", 40021);

    tokio::time::advance(Duration::from_secs(11)).await;
    a.adapter.task().await;

    let gesendet = a.transport.gesendet_entnehmen();
    let disconnects = gesendet
        .iter()
        .filter(|(daten, _)| daten[..] == dplus::DISCONNECT)
        .count();
    assert_eq!(disconnects, 1);
    assert_eq!(a.clients.anzahl(), 0);
}

#[tokio::test(start_paused = true)]
async fn keepalive_vom_client_verhindert_timeout() {
    let mut a = aufbau(ListGatekeeper::offen());
    angemeldet(&mut a, "DL1ABC", 40022);

    tokio::time::advance(Duration::from_secs(6)).await;
    a.transport.eingang_einreihen(&dplus::KEEPALIVE, adresse(40022));
    a.adapter.task().await;

    tokio::time::advance(Duration::from_secs(6)).await;
    a.transport.gesendet_entnehmen();
    a.adapter.task().await;

    let gesendet = a.transport.gesendet_entnehmen();
    assert!(gesendet.iter().any(|(daten, _)| daten[..] == dplus::KEEPALIVE));
    assert!(gesendet.iter().all(|(daten, _)| daten[..] != dplus::DISCONNECT));
    assert_eq!(a.clients.anzahl(), 1);
}

// ---------------------------------------------------------------------------
// Ende-zu-Ende mit LocalReflector
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stream_wird_an_andere_clients_verteilt() {
    let transport = Arc::new(AufzeichnenderTransport::neu());
    let clients = ClientDirectory::neu();
    let queue = PacketQueue::neu();
    let kern = Arc::new(
        LocalReflector::neu(
            Callsign::from("REF001"),
            "ABCD",
            clients.clone(),
            vec![queue.clone()],
        )
        .expect("Kern muss erstellt werden"),
    );
    let mut adapter = DplusProtocol::neu(
        DplusConfig::default(),
        transport.clone(),
        clients.clone(),
        Arc::new(ListGatekeeper::offen()),
        kern.clone(),
        queue,
    );

    let sender = adresse(40030);
    let hoerer = adresse(40031);
    adapter.paket_verarbeiten(&login("DL1ABC"), sender);
    adapter.paket_verarbeiten(&login("F4XYZ"), hoerer);
    transport.gesendet_entnehmen();

    adapter.paket_verarbeiten(&header(0x6666, "DL1ABC G", "REF001 A"), sender);
    adapter.paket_verarbeiten(&frame(0x6666, 0), sender);
    adapter.task().await;

    let gesendet = transport.gesendet_entnehmen();
    assert!(gesendet.iter().all(|(_, ziel)| *ziel == hoerer));
    // Hoerer ohne Modul: gepatchter und nativer Header, dann der Frame
    assert_eq!(gesendet.len(), 3);
    assert_eq!(gesendet[0].0.len(), dplus::HEADER_LAENGE);
    assert_eq!(gesendet[1].0.len(), dplus::HEADER_LAENGE);
    assert_eq!(gesendet[2].0.len(), dplus::FRAME_LAENGE);

    adapter.paket_verarbeiten(&last_frame(0x6666, 1), sender);
    assert_eq!(kern.offene_streams(), 0);
    assert_eq!(kern.zuletzt_gehoert_liste().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn header_wiederholung_mit_zwei_hoerern() {
    let transport = Arc::new(AufzeichnenderTransport::neu());
    let clients = ClientDirectory::neu();
    let queue = PacketQueue::neu();
    let kern = Arc::new(
        LocalReflector::neu(
            Callsign::from("REF001"),
            "ABCD",
            clients.clone(),
            vec![queue.clone()],
        )
        .expect("Kern muss erstellt werden"),
    );
    let mut adapter = DplusProtocol::neu(
        DplusConfig::default(),
        transport.clone(),
        clients.clone(),
        Arc::new(ListGatekeeper::offen()),
        kern,
        queue,
    );

    let sender = adresse(40032);
    let hoerer = [adresse(40033), adresse(40034)];
    adapter.paket_verarbeiten(&login("DL1ABC"), sender);
    adapter.paket_verarbeiten(&login("F4XYZ"), hoerer[0]);
    adapter.paket_verarbeiten(&login("G0ABC"), hoerer[1]);
    {
        let mut verzeichnis = clients.sperren();
        for ziel in hoerer {
            verzeichnis
                .finden_mut(ziel, Protocol::DPlus)
                .expect("Hoerer vorhanden")
                .modul_setzen('A');
        }
    }
    transport.gesendet_entnehmen();

    adapter.paket_verarbeiten(&header(0x7777, "DL1ABC G", "REF001 A"), sender);
    for seq in 0..11u8 {
        adapter.paket_verarbeiten(&frame(0x7777, seq), sender);
    }
    adapter.task().await;

    let gesendet = transport.gesendet_entnehmen();
    assert!(gesendet.iter().all(|(_, ziel)| hoerer.contains(ziel)));
    let header: Vec<SocketAddr> = gesendet
        .iter()
        .filter(|(daten, _)| daten.len() == dplus::HEADER_LAENGE)
        .map(|(_, ziel)| *ziel)
        .collect();
    // Je ein Header, dazu eine Wiederholung nach 21 gezaehlten Frames
    assert_eq!(header, vec![hoerer[0], hoerer[1], hoerer[0]]);
    assert_eq!(gesendet.len(), 25);
}
