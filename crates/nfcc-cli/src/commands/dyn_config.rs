//! Dynamic power configuration command

use anyhow::{Context, Result};
use nfcc_power::sim::SimulatedController;
use nfcc_power::NfcService;

use crate::output::{DynConfigRow, OutputContext};

/// Apply each length-prefixed request (hex) in turn
pub fn dyn_config(
    service: &NfcService,
    controller: &SimulatedController,
    requests: &[String],
    ctx: &OutputContext,
) -> Result<()> {
    let mut rows = Vec::with_capacity(requests.len());
    for request in requests {
        let bytes = hex::decode(request)
            .with_context(|| format!("Invalid hex request: {}", request))?;
        let result = service.power_set_dynamic_config(&bytes);
        rows.push(DynConfigRow {
            request: request.to_lowercase(),
            result: result.to_string(),
            controller_value: hex::encode(controller.dynamic_power()),
        });
    }

    ctx.print(&rows);
    Ok(())
}
