/// Event loop harness over a headless backend.
pub mod harness;
/// Widgets and window handlers that log every callback.
pub mod recorder;

pub use harness::Harness;
pub use recorder::{Log, Recorder, Seen, WindowRecorder};
