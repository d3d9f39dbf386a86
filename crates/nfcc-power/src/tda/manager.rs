//! TDA session manager

use std::sync::Arc;
use std::time::Duration;

use nfcc_core::{FirmwareResult, NfcStatus, TdaCallback, TdaEvent, TdaInterface, TdaSlot};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::records::copy_slots;
use crate::dispatch::TdaDispatcher;
use crate::error::TdaError;

/// Wait window for every TDA operation
pub const DEFAULT_TDA_TIMEOUT: Duration = Duration::from_millis(1000);

/// Connection id reported when a slot could not be opened
pub const INVALID_CONNECTION_ID: u8 = 0x00;

/// Issues TDA commands and waits for their completions
pub struct TdaManager {
    firmware: Arc<dyn TdaInterface>,
    dispatcher: Arc<TdaDispatcher>,
    /// One request in flight at a time
    request: Mutex<()>,
    timeout: Duration,
}

impl TdaManager {
    pub fn new(firmware: Arc<dyn TdaInterface>) -> Self {
        Self {
            firmware,
            dispatcher: TdaDispatcher::new(),
            request: Mutex::new(()),
            timeout: DEFAULT_TDA_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Dispatcher receiving this manager's firmware completions
    pub fn dispatcher(&self) -> &Arc<TdaDispatcher> {
        &self.dispatcher
    }

    /// Discover attached slots. Zero slots is a valid result.
    pub fn discover(&self) -> Result<Vec<TdaSlot>, TdaError> {
        match self.execute("discover", |fw, cb| fw.discover_tda_slots(cb))? {
            TdaEvent::Discovered { control, .. } => {
                let slots = copy_slots(&control);
                info!(count = slots.len(), "TDA slots discovered");
                Ok(slots)
            }
            other => Err(unexpected("discover", &other)),
        }
    }

    /// Open a slot and return its connection id
    pub fn open(&self, slot_id: u8, standby: bool) -> Result<u8, TdaError> {
        debug!(slot_id, standby, "Open TDA");
        match self.execute("open", |fw, cb| fw.open_tda_slot(slot_id, standby, cb))? {
            TdaEvent::Opened { connection_id, .. } => Ok(connection_id),
            other => Err(unexpected("open", &other)),
        }
    }

    pub fn close(&self, slot_id: u8, standby: bool) -> Result<(), TdaError> {
        debug!(slot_id, standby, "Close TDA");
        match self.execute("close", |fw, cb| fw.close_tda_slot(slot_id, standby, cb))? {
            TdaEvent::Closed { .. } => Ok(()),
            other => Err(unexpected("close", &other)),
        }
    }

    /// Send raw bytes to the open slot and return its response.
    ///
    /// The firmware response buffer is released when the completion is
    /// dropped, whichever way this returns.
    pub fn transceive(&self, command: &[u8]) -> Result<Vec<u8>, TdaError> {
        debug!(len = command.len(), "Transceive TDA");
        match self.execute("transceive", |fw, cb| fw.transceive_tda(command, cb))? {
            TdaEvent::Transceived { response, .. } => Ok(response.as_slice().to_vec()),
            other => Err(unexpected("transceive", &other)),
        }
    }

    fn execute<F>(&self, op: &'static str, issue: F) -> Result<TdaEvent, TdaError>
    where
        F: FnOnce(&dyn TdaInterface, TdaCallback) -> FirmwareResult<()>,
    {
        let _request = self.request.lock();
        let mut slot = self.dispatcher.completion.lock();
        slot.value = None;
        let request = slot.begin();

        if let Err(source) = issue(self.firmware.as_ref(), self.dispatcher.callback(request)) {
            slot.finish();
            error!(op, error = %source, "TDA command rejected");
            return Err(TdaError::Rejected { op, source });
        }

        slot.wait_for(self.timeout);
        slot.finish();
        let event = slot.value.take();
        drop(slot);

        let event = event.ok_or_else(|| {
            error!(op, "No TDA response");
            TdaError::Timeout { op }
        })?;
        let status = event.status();
        if status != NfcStatus::OK {
            error!(op, %status, "TDA command failed");
            return Err(TdaError::Status { op, status });
        }
        Ok(event)
    }
}

fn unexpected(op: &'static str, event: &TdaEvent) -> TdaError {
    error!(op, received = event.kind(), "Unexpected TDA completion");
    TdaError::UnexpectedEvent {
        op,
        received: event.kind(),
    }
}
