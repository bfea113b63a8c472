//! Rendering-engine plumbing for pagekiln.
//!
//! This crate owns everything on the far side of the engine boundary: the
//! newline-delimited JSON event protocol, the engine child process, the
//! external compile commands and the text rewrites applied to their output.

pub mod bundle;
pub mod event;
pub mod session;
pub mod toolchain;

pub use bundle::{inline_json_stringify, rewrite_in_place, to_esm_module, BundleError};
pub use event::{Bootstrap, EngineEvent, GeneratedFile, HeadTag, PageDescriptor, ProtocolError};
pub use session::{EngineConfig, EngineSession, EventReceiver, RenderMode, SessionError};
pub use toolchain::{expand_output, run_shell, ToolchainError};
