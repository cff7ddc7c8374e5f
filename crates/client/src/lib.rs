//! # Attaché Client
//!
//! reqwest implementation of the vendor assistant-platform API defined in
//! `attache-core`. One implementation, `AssistantsClient`, covering the
//! thread, run, file, and vector-store operations the agent needs.

mod http;
mod sse;

pub use http::AssistantsClient;
