//! Aivis Session - obtain and check credentials for conversational surfaces.
//!
//! - [`capture`] - interactive, visible-browser login that captures the session cookie
//! - [`validator`] - probes stored credentials and caches the outcome

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod capture;
pub mod error;
pub mod validator;

pub use capture::{
    extract_session_token, CapturedSession, LoginStarted, LoginStatus, Platform, SessionCapture,
    SessionInfo, SessionState,
};
pub use error::{Result, SessionError};
pub use validator::{
    EngineTokenStatus, InMemoryTokenStatusStore, TokenStatusReport, TokenStatusStore,
    TokenValidation, TokenValidator,
};
