//! Narration output seam
//!
//! This module defines the trait through which the game pushes
//! plain-text announcement lines to a speech service. The trait keeps
//! the state machine independent of any particular speech platform:
//! narration is fire-and-forget and is never awaited by scoring logic.

/// Trait for receiving narration lines
///
/// Implementations typically forward the line to a text-to-speech
/// engine. Sending must not block; the game never consumes a return
/// value.
pub trait Narrator {
    /// Delivers one announcement line
    ///
    /// # Arguments
    ///
    /// * `line` - The plain-text sentence to read aloud
    fn announce(&self, line: &str);
}

/// Narrator for platforms without speech output
///
/// Lines are logged at debug level and dropped so that gameplay is
/// never blocked by missing speech capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNarrator;

impl Narrator for SilentNarrator {
    fn announce(&self, line: &str) {
        log::debug!("narration skipped (no speech output): {line}");
    }
}
