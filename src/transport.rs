//! Frame delivery to the display.
//!
//! The physical SPI link lives outside this crate; everything that pushes
//! frames implements `FrameSink`.

use crate::logging::{self, Component};
use crate::model::WeatherError;

pub trait FrameSink {
    fn send(&mut self, frame: &[u8]) -> Result<(), WeatherError>;
}

/// Writes every frame to the log as hex. Used when no bus is attached.
#[derive(Debug, Default)]
pub struct LogSink {
    sent: usize,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_sent(&self) -> usize {
        self.sent
    }
}

impl FrameSink for LogSink {
    fn send(&mut self, frame: &[u8]) -> Result<(), WeatherError> {
        self.sent += 1;
        logging::info(
            Component::Transport,
            None,
            &format!("Sending data {} to device", logging::hex_frame(frame)),
        );
        Ok(())
    }
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<Vec<u8>>,
}

impl FrameSink for MemorySink {
    fn send(&mut self, frame: &[u8]) -> Result<(), WeatherError> {
        self.frames.push(frame.to_vec());
        Ok(())
    }
}

/// Three-byte wiring check pattern: an up-counter, a down-counter and an
/// alternating 0x55 / 0xAA byte.
pub fn test_pattern(counter: u32) -> [u8; 3] {
    let up = (counter % 255) as u8;
    let down = ((255 - counter % 255) % 255) as u8;
    let toggle = if counter % 2 == 1 { 0x55 } else { 0xAA };
    [up, down, toggle]
}
