//! Request-dispatch core for a multi-tenant HTTP mocking and proxying
//! service: alias routing, mode arbitration, endpoint matching, rule-based
//! response selection, delay composition, upstream forwarding with loop
//! detection, and response synthesis.
//!
//! This crate is framework-agnostic: it operates over the [`request::DispatchRequest`]
//! and [`dispatcher::DispatchResponse`] value types rather than binding to any
//! particular HTTP server. An embedding application supplies a
//! [`repository::Repository`] implementation and drives [`dispatcher::Dispatcher::handle`]
//! per inbound request.

pub mod delay;
pub mod dispatcher;
pub mod error;
pub mod forwarder;
pub mod headers;
pub mod model;
pub mod repository;
pub mod request;
pub mod response_builder;
pub mod rules;
pub mod selector;

pub use dispatcher::{DispatchOutcome, DispatchResponse, Dispatcher, EnvelopeTexts, ExecutionMode};
pub use error::{Error, Result};
pub use repository::Repository;
pub use request::DispatchRequest;
