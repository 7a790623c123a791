// src/cli/handlers/mod.rs

// One module per command. Each exposes `handle(args, token)`.

/// Runtime and session setup shared by the commands.
pub mod commons;
/// `shellbent doctor`
pub mod doctor;
/// `shellbent expand`
pub mod expand;
/// `shellbent render`
pub mod render;
/// `shellbent tags`
pub mod tags;
/// `shellbent watch`
pub mod watch;
