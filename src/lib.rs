//! RSVP Server - HTTP API for an event-RSVP application.
//!
//! This crate provides a small request-routing and serialization layer over
//! an external key-value store:
//! - Authenticating callers via shared-secret bearer tokens (admin/user)
//! - CRUD over two collections, "events" and "users", each persisted as a
//!   whole JSON array under a single store key
//! - A uniform JSON response envelope with permissive CORS headers
//!
//! # Architecture
//!
//! Requests flow through CORS handling, role resolution, and path-based
//! dispatch into per-resource handlers. Every collection mutation reads the
//! whole collection, mutates it in memory, and writes it back whole; the
//! store is the only shared mutable resource and the read-then-write pair is
//! not atomic.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod store;
pub mod types;
