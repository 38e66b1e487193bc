//! Grid Bastion - authoritative real-time engine for multiplayer
//! grid battles.
//!
//! Matches run on a 40x40 grid split by diagonal barriers with four
//! crossing zones. Participants deploy card-based units that path
//! toward enemy bases, with combat, elixir economy, and turn or
//! continuous scheduling all resolved server-side. Bot seats fill out
//! matches, learning card preferences from persisted aggregate
//! statistics.

pub mod arena;
pub mod bot;
pub mod core;
pub mod net;
pub mod session;
pub mod stats;
