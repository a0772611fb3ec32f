//! reflektor-dplus – DPlus-Protokoll-Adapter
//!
//! Verbindet das DPlus-UDP-Protokoll mit dem protokollneutralen Relay-Kern.
//!
//! ## Module
//! - [`config`] – Zeitkonstanten des Adapters
//! - [`streams`] – Lokal verfolgte Streams (Handle, Absender, Aktivitaet)
//! - [`cache`] – Header-Cache und Frame-Zaehler pro Modul
//! - [`dispatcher`] – Ausgangs-Queue abarbeiten und an Clients verteilen
//! - [`keepalive`] – Keepalive senden, inaktive Clients entfernen
//! - [`protocol`] – Task-Loop und Eingangsverarbeitung

pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod keepalive;
pub mod protocol;
pub mod streams;

pub use cache::ModulCache;
pub use config::DplusConfig;
pub use dispatcher::Dispatcher;
pub use keepalive::KeepaliveSupervisor;
pub use protocol::DplusProtocol;
pub use streams::{LokalerStream, StreamRegistry};
