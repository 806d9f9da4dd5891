// Relay node library
// Exposes the peer-to-peer network monitor for the binary and for tests.

#[macro_use]
extern crate log;

pub mod config;
pub mod p2p;
