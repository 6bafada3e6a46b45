pub mod backend;
pub mod mixdown;
pub mod padder;
pub mod waveform;

pub use backend::{AudioBackend, LocalAudioBackend, MixdownOutput, PadOutput, RemoteAudioBackend};
