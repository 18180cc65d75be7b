//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every [`LoopEvent`] as one
//! pipe-delimited line through the `log` facade.  The loop already logs
//! faults and duty writes at their own levels, so this adapter stays at
//! `debug` except for the lifecycle edges.

use log::{debug, info};

use crate::app::events::LoopEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`LoopEvent`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &LoopEvent) {
        match event {
            LoopEvent::Started => info!("LOOP | started"),
            LoopEvent::Stopped => info!("LOOP | stopped"),
            LoopEvent::PinAcquired { pin } => debug!("LOOP | pin={pin} acquired"),
            LoopEvent::DutyApplied { distance, duty } => {
                debug!("FADE | d={distance:.3}m duty={duty:.3}");
            }
            LoopEvent::AlarmEntered {
                distance,
                threshold,
            } => {
                info!("ALARM | entered d={distance:.3}m < {threshold:.2}m");
            }
            LoopEvent::AlarmCleared { distance } => {
                info!("ALARM | cleared d={distance:.3}m");
            }
            LoopEvent::SensorFault(e) => debug!("FAULT | sensor: {e}"),
            LoopEvent::HardwareFault(e) => debug!("FAULT | hardware: {e}"),
        }
    }
}
