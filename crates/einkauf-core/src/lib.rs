//! # einkauf-core
//!
//! Foundation types for the Einkauf realtime client.
//!
//! This crate provides the shared vocabulary the connection manager and its
//! consumers depend on:
//!
//! - **Wire messages**: [`ClientMessage`] / [`ServerMessage`] matching the
//!   server's JSON envelope (`{"type": ..., "data": ...}`)
//! - **Branded IDs**: [`UserId`] newtype for the originating-user field
//! - **Event categories**: well-known category strings in [`events`],
//!   including the connection lifecycle categories
//! - **Errors**: [`RealtimeError`] hierarchy via `thiserror`
//! - **Backoff math**: pure reconnect-delay calculation in [`retry`]
//!
//! Everything here is sync and transport-agnostic; the async machinery
//! lives in `einkauf-realtime`.

#![deny(unsafe_code)]

pub mod constants;
pub mod errors;
pub mod events;
pub mod ids;
pub mod messages;
pub mod retry;

pub use errors::RealtimeError;
pub use ids::UserId;
pub use messages::{ClientMessage, ServerMessage};
