//! Marketchat - product-scoped buyer/seller chat for a marketplace.
//!
//! A buyer opens a conversation with a product's seller over REST; both
//! sides then exchange messages live over a websocket channel. Every
//! message is stored before it is broadcast, so history fetched later
//! matches what was seen live.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
