//! Setting handlers for different configuration patterns.

pub mod boolean;
pub mod dialect;
pub mod seconds;
pub mod text;

pub use boolean::*;
pub use dialect::*;
pub use seconds::*;
pub use text::*;
