//! Device capabilities consumed by the emergency controller
//!
//! Each capability sits behind a trait so the session logic can run against
//! real devices, the terminal, the HTTP API or scripted fakes:
//! - [`LocationProvider`] - single-shot position fix
//! - [`Dialer`] - `tel:` hand-off
//! - [`AnswerDetector`] - whether a call was answered
//!
//! Audio capture lives in [`crate::audio`].

mod answer;
mod dialer;
mod links;
mod location;
mod permission;

pub use answer::{AnswerDetector, AnswerPrompt, ChannelAnswers, ScriptedAnswers, TerminalPrompt};
pub use dialer::{Dialer, LogDialer};
pub use links::{mailto_url, map_url, tel_url};
pub use location::{
    query_with_timeout, FixedLocationProvider, LocationOptions, LocationProvider, LocationSample,
};
pub use permission::{PermissionState, PermissionStatus};
