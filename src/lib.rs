//! Purpose: Library crate behind the `platestream` CLI and tests.
//! Exports: `api` (entities, cursor, codecs, reader, writer, errors).
//! Role: Decode and encode microplate wells, sets, plates, and stacks.
//! Invariants: `api` is the only public module; codec and core internals stay private.
//! Invariants: Every fallible operation returns `api::Error`; nothing panics on bad input.
pub mod api;
mod codec;
mod core;
mod json;
