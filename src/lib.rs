//! cbtquest - terminal client for the CBT adventure battle
//!
//! The battle core (state, actions, reducer, effects) is rendering-agnostic;
//! `ui` renders it with ratatui and `runner` executes effects against an
//! `AdventureApi`.

pub mod action;
pub mod animation;
pub mod api;
pub mod auth;
pub mod effect;
pub mod reducer;
pub mod runner;
pub mod session;
pub mod state;
pub mod ui;
