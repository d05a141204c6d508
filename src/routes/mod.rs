//! Router Module Index
//!
//! Route groups of the gateway, each with its own access rule. The path-prefix route
//! guard is applied on top of all of them in `create_router`.

/// Routes reachable by anyone.
pub mod public;

/// The console shell, protected by the page-level `ConsoleSession` guard.
pub mod console;

/// The two proxy surfaces relaying to the upstream API.
pub mod proxy;
