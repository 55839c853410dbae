//! Filament weight providers.

use core::sync::atomic::{AtomicI32, Ordering};

use crate::app::ports::WeightSensor;

/// A load cell stand-in holding a settable reading.
#[derive(Debug, Default)]
pub struct FixedWeight {
    grams: AtomicI32,
}

impl FixedWeight {
    pub fn new(grams: i32) -> Self {
        Self {
            grams: AtomicI32::new(grams),
        }
    }

    pub fn set(&self, grams: i32) {
        self.grams.store(grams, Ordering::Relaxed);
    }
}

impl WeightSensor for FixedWeight {
    fn read_grams(&self) -> i32 {
        self.grams.load(Ordering::Relaxed)
    }
}
