//! Channel contract shared by the courier adapters and their callers.
//!
//! Defines the canonical message types flowing in both directions and the
//! seam traits: `InboundSink` for caller-supplied business logic and
//! `Outbound` for anything that can deliver a message.

pub mod plugin;

pub use plugin::{DeliveryResult, InboundEvent, InboundSink, Outbound, OutboundMessage, Platform};
