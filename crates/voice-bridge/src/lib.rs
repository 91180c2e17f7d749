//! Real-time voice bridge between the browser and the Gemini Live API.
//!
//! * [`pcm`] converts between browser float samples and 16-bit PCM.
//! * [`capture`] gates microphone frames on the session being active.
//! * [`playback`] schedules response audio back-to-back on an output clock.
//! * [`live`] / [`transport`] speak the Live wire protocol over a WebSocket.
//! * [`tools`] holds the capabilities the remote model may call.
//! * [`session`] drives one voice session from connect to teardown.

pub mod capture;
pub mod error;
pub mod live;
pub mod pcm;
pub mod playback;
pub mod session;
pub mod tools;
pub mod transport;

pub use error::VoiceError;
pub use playback::{ManualClock, MonotonicClock, OutputClock, PlaybackScheduler, ScheduledUnit};
pub use session::{SessionConfig, SessionEvent, SessionInput, SessionState, VoiceSession};
pub use tools::{BoardControl, BoardState, Capability, MoveAck};
pub use transport::{GeminiLiveConnector, LiveConnection, LiveConnector};
