pub mod backend;
pub mod chat_stream;
pub mod config;
pub mod fallback;
pub mod frame_decoder;
pub mod message;
pub mod orchestrator;
pub mod params;
pub mod sanitizer;
pub mod tool_calls;
pub mod tools;
pub mod watchdog;
