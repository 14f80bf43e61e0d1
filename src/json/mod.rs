//! Purpose: Internal JSON parsing boundary shared by runtime callsites.
//! Exports: `parse` module with decode helpers used by the codec and fixture loader.
//! Role: Single seam for parser details so callsites avoid ad hoc decode logic.
//! Invariants: Payload and fixture decoding go through this module.
//! Invariants: Helper APIs stay small and deterministic (no hidden global state).

pub(crate) mod parse;
