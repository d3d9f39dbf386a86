//! Response buffer accounting

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nfcc_core::{BufferPool, FirmwareBuffer};

/// Buffer pool that counts allocations and releases
#[derive(Debug, Default)]
pub struct TrackingPool {
    allocated: AtomicUsize,
    released: AtomicUsize,
}

impl TrackingPool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Hand out a buffer that returns to this pool when dropped
    pub fn allocate(self: &Arc<Self>, data: Vec<u8>) -> FirmwareBuffer {
        self.allocated.fetch_add(1, Ordering::SeqCst);
        FirmwareBuffer::pooled(data, self.clone())
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Buffers handed out and not yet released
    pub fn outstanding(&self) -> usize {
        self.allocated() - self.released()
    }
}

impl BufferPool for TrackingPool {
    fn release(&self, _len: usize) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
