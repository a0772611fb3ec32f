//! Header-Cache pro Modul
//!
//! DPlus-Clients, die mitten in einen Stream einsteigen, brauchen den Header.
//! Der Adapter merkt sich daher pro Modul den letzten Header und schickt ihn
//! alle 21 Frames erneut mit. Der Zaehler laeuft pro Empfaenger.

use reflektor_core::MODUL_ANZAHL;
use reflektor_protocol::dplus::SEQUENZ_MODULO;
use reflektor_protocol::DvHeaderPacket;

#[derive(Debug)]
pub struct ModulCache {
    header: [Option<DvHeaderPacket>; MODUL_ANZAHL],
    zaehler: [u32; MODUL_ANZAHL],
}

impl Default for ModulCache {
    fn default() -> Self {
        Self {
            header: std::array::from_fn(|_| None),
            zaehler: [0; MODUL_ANZAHL],
        }
    }
}

impl ModulCache {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Ersetzt den Header eines Moduls und setzt den Frame-Zaehler zurueck
    pub fn header_setzen(&mut self, index: usize, header: DvHeaderPacket) {
        if index >= MODUL_ANZAHL {
            return;
        }
        self.header[index] = Some(header);
        self.zaehler[index] = 0;
    }

    pub fn header(&self, index: usize) -> Option<&DvHeaderPacket> {
        self.header.get(index)?.as_ref()
    }

    /// Zaehlt einen Frame und liefert eine Kopie des Headers, wenn er erneut
    /// gesendet werden muss (Zaehlerstand vor dem Erhoehen % 21 == 20)
    pub fn frame_zaehlen(&mut self, index: usize) -> Option<DvHeaderPacket> {
        let zaehler = self.zaehler.get_mut(index)?;
        let vorher = *zaehler;
        *zaehler = zaehler.wrapping_add(1);

        if vorher % u32::from(SEQUENZ_MODULO) == u32::from(SEQUENZ_MODULO) - 1 {
            self.header[index].clone()
        } else {
            None
        }
    }
}
