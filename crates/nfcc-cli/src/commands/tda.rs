//! TDA commands - discovery and open/transceive/close exchanges

use anyhow::{bail, Context, Result};
use nfcc_power::{NfcService, NfcStatus, INVALID_CONNECTION_ID};

use crate::output::{ExchangeRow, OutputContext, SlotRow};

/// List attached TDA slots
pub fn discover(service: &NfcService, ctx: &OutputContext) -> Result<()> {
    let Some(slots) = service.tda_discover() else {
        bail!("TDA discovery failed");
    };

    let rows: Vec<SlotRow> = slots
        .into_iter()
        .map(|slot| SlotRow {
            id: slot.id,
            status: slot.status,
            protocols: hex::encode(&slot.protocols),
            card_info: slot
                .card_info
                .iter()
                .map(|tlv| format!("{:02x}:{}", tlv.tlv_type, hex::encode(&tlv.value)))
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect();
    ctx.print(&rows);
    Ok(())
}

/// Open `slot_id`, send each command (hex) and close the slot again
pub fn exchange(
    service: &NfcService,
    slot_id: u8,
    standby: bool,
    commands: &[String],
    ctx: &OutputContext,
) -> Result<()> {
    let commands = commands
        .iter()
        .map(|c| hex::decode(c).with_context(|| format!("Invalid hex command: {}", c)))
        .collect::<Result<Vec<_>>>()?;

    let connection_id = service.tda_open(slot_id, standby);
    if connection_id == INVALID_CONNECTION_ID {
        bail!("Failed to open TDA slot {}", slot_id);
    }

    let mut rows = vec![ExchangeRow {
        step: "open".to_string(),
        data: format!("slot {}", slot_id),
        result: format!("connection {}", connection_id),
    }];
    for command in &commands {
        let result = match service.tda_transceive(command) {
            Some(response) => hex::encode(response),
            None => "failed".to_string(),
        };
        rows.push(ExchangeRow {
            step: "transceive".to_string(),
            data: hex::encode(command),
            result,
        });
    }

    let status = service.tda_close(slot_id, standby);
    rows.push(ExchangeRow {
        step: "close".to_string(),
        data: format!("slot {}", slot_id),
        result: status.to_string(),
    });

    ctx.print(&rows);
    if status != NfcStatus::OK {
        ctx.error(&format!("Close failed with status {}", status));
    }
    Ok(())
}
