// Core modules implementing the value model, codec, registries, and errors.
pub mod codec;
pub mod error;
pub mod format;
pub mod functions;
pub mod node;
pub mod registry;
