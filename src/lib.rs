//! vastuchat drives a streaming chat with a language model that can call out
//! to a floor-plan generation service, and always leaves the user with an
//! answer even when the model stalls or stays silent.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns stream decoding, tool-call extraction and execution, the
//!   stall and fallback timers, response sanitizing, and the turn
//!   orchestrator that ties them together.
//! - [`api`] defines the chat and layout-backend payloads.
//! - [`cli`] is a line-oriented front end over [`core::orchestrator`].
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
