//! Copying firmware discovery payloads into owned slot records

use nfcc_core::{CardTlv, RawCardTlv, RawTdaSlot, TdaControl, TdaSlot};
use tracing::warn;

/// Copy the discovered slots out of a firmware payload.
///
/// Every count and length the firmware declares is honoured, but never
/// beyond the data actually present; mismatches are logged and truncated.
pub fn copy_slots(control: &TdaControl) -> Vec<TdaSlot> {
    bounded(&control.slots, control.num_tda_supported, "slots")
        .iter()
        .map(copy_slot)
        .collect()
}

fn copy_slot(raw: &RawTdaSlot) -> TdaSlot {
    TdaSlot {
        id: raw.id,
        status: raw.status,
        protocols: bounded(&raw.protocols, raw.number_of_protocols, "protocols").to_vec(),
        card_info: bounded(&raw.card_tlv_info, raw.number_of_card_info, "card info")
            .iter()
            .map(copy_card_tlv)
            .collect(),
    }
}

fn copy_card_tlv(raw: &RawCardTlv) -> CardTlv {
    CardTlv {
        tlv_type: raw.tlv_type,
        value: bounded(&raw.value, raw.length, "card value").to_vec(),
    }
}

fn bounded<'a, T>(items: &'a [T], declared: u8, what: &'static str) -> &'a [T] {
    let declared = usize::from(declared);
    if declared != items.len() {
        warn!(
            what,
            declared,
            present = items.len(),
            "TDA payload count mismatch"
        );
    }
    &items[..declared.min(items.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw_slot() -> RawTdaSlot {
        RawTdaSlot {
            id: 0x20,
            status: 1,
            number_of_protocols: 2,
            protocols: vec![0x04, 0x05],
            number_of_card_info: 1,
            card_tlv_info: vec![RawCardTlv {
                tlv_type: 0x01,
                length: 3,
                value: vec![0xA0, 0x00, 0x01],
            }],
        }
    }

    #[test]
    fn test_copy_slots() {
        let control = TdaControl {
            num_tda_supported: 1,
            slots: vec![raw_slot()],
        };

        assert_eq!(
            copy_slots(&control),
            vec![TdaSlot {
                id: 0x20,
                status: 1,
                protocols: vec![0x04, 0x05],
                card_info: vec![CardTlv {
                    tlv_type: 0x01,
                    value: vec![0xA0, 0x00, 0x01],
                }],
            }]
        );
    }

    #[test]
    fn test_copy_honours_declared_counts() {
        let mut slot = raw_slot();
        slot.number_of_protocols = 1;
        slot.card_tlv_info[0].length = 2;
        let control = TdaControl {
            num_tda_supported: 1,
            slots: vec![slot, raw_slot()],
        };

        let slots = copy_slots(&control);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].protocols, vec![0x04]);
        assert_eq!(slots[0].card_info[0].value, vec![0xA0, 0x00]);
    }

    #[test]
    fn test_copy_never_reads_past_present_data() {
        let mut slot = raw_slot();
        slot.number_of_card_info = 4;
        slot.card_tlv_info[0].length = 200;
        let control = TdaControl {
            num_tda_supported: 3,
            slots: vec![slot],
        };

        let slots = copy_slots(&control);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].card_info.len(), 1);
        assert_eq!(slots[0].card_info[0].length(), 3);
    }

    #[test]
    fn test_zero_slots_is_empty() {
        assert!(copy_slots(&TdaControl::default()).is_empty());
    }
}
