//! Session controller, phase machine and serialized event loop for
//! Castaway.
//!
//! Each session is a single-owner actor: connections and the clock push
//! events onto a channel, and one task applies them to the [`Game`] in
//! order. Nothing in a session is locked.
//!
//! # Modules
//!
//! - [`clock`] -- Tick-driven session clock with a single one-shot timer.
//! - [`config`] -- Configuration loading from `castaway-config.yaml` into
//!   strongly-typed structs.
//! - [`context`] -- Session-wide state shared by every phase.
//! - [`game`] -- The session controller and its inbound message type.
//! - [`participant`] -- Participants, outboxes and the roster.
//! - [`phase`] -- Waiting, site selection and site visit.
//! - [`registry`] -- Name-keyed registry of running sessions.
//! - [`runner`] -- The event loop, the clock task and admission.
//! - [`site_event`] -- Site event content, resolution and generation.
//! - [`trade`] -- The two-party trade handshake.
//!
//! [`Game`]: game::Game

pub mod clock;
pub mod config;
pub mod context;
pub mod game;
pub mod participant;
pub mod phase;
pub mod registry;
pub mod runner;
pub mod site_event;
pub mod trade;
