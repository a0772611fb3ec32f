//! reflektor-protocol – Paketmodell und Wire-Codec
//!
//! - [`dv`] – protokollneutrale DV-Pakete (Header, Frame, Last-Frame)
//! - [`dplus`] – Klassifizierung und Kodierung des DPlus-UDP-Protokolls
//! - [`error`] – Codec-Fehler

pub mod dplus;
pub mod dv;
pub mod error;

pub use dplus::DplusPaket;
pub use dv::{DvFramePacket, DvHeaderPacket, DvLastFramePacket, DvPacket, QueueEntry};
pub use error::CodecError;
