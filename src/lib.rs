//! A synchronous, thread-and-channel air traffic control training scope:
//! protocol/replay/ingest/simulated backends behind one capability trait,
//! a command pipeline modeled on real ATC client text commands, a pure
//! radar-scope rendering pipeline, a multi-controller session server, and
//! a scenario launcher for self-contained practice sessions.

pub mod airports;
pub mod backend;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod request;
pub mod routes;
pub mod rpc;
pub mod scenario;
pub mod scope;
pub mod weather;
pub mod world;
