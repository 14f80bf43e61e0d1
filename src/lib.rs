//! Purpose: Tagged JSON pickling library backing the `picklebox` CLI and its tests.
//! Exports: `api` (value model, codec, registries, harness, fixture), `builtins`,
//! and the `function_def!` macro.
//! Role: Encode objects, enums, tuples, class references, and registered functions to
//! JSON text and decode them back under a documented round-trip contract.
//! Invariants: `api` is the public path; `core` internals are reached through it.
//! Invariants: Modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod builtins;
mod core;
mod json;
