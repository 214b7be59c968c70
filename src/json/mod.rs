//! Purpose: Internal JSON parsing boundary shared by the tagged-record codec and probes.
//! Exports: `parse` module with stream decode and error-mapping helpers.
//! Role: Single seam for serde_json stream usage so callsites avoid ad hoc decode logic.
//! Invariants: JSON record decoding goes through this module.
//! Invariants: Helper APIs stay small and deterministic (no hidden global state).

pub(crate) mod parse;
