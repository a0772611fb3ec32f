//! reflektor-relay – Relay-Kern und gemeinsame Dienste
//!
//! Stellt die Dienste bereit, die alle Protokoll-Adapter gemeinsam nutzen.
//!
//! ## Module
//! - [`clients`] – Gemeinsames Client-Verzeichnis (Mutex-geschuetzt)
//! - [`queue`] – Ausgangs-Queue eines Adapters
//! - [`gatekeeper`] – Autorisierung fuer Link und Senden
//! - [`reflector`] – Relay-Kern: Streams, Module, Last-Heard
//! - [`transport`] – UDP-Transport mit Send-Queue

pub mod clients;
pub mod gatekeeper;
pub mod queue;
pub mod reflector;
pub mod transport;

pub use clients::{Client, ClientDirectory, ClientFamilie, Clients};
pub use gatekeeper::{Gatekeeper, ListGatekeeper};
pub use queue::PacketQueue;
pub use reflector::{LocalReflector, RelayCore};
pub use transport::{Transport, UdpTransport};

#[cfg(any(test, feature = "test-util"))]
pub use transport::AufzeichnenderTransport;
