//! Configuration document validation.
//!
//! # Responsibilities
//! - Reject documents the proxy would refuse or mis-dispatch
//! - Check listen addresses, handler chains, upstream dial addresses
//! - Detect host matchers claimed by more than one route
//!
//! # Design Decisions
//! - Pure function: &Config → Result<(), ValidationError>
//! - Stops at the first error; the error names server, route and handler
//! - Unknown handler kinds are accepted; the proxy is the authority on them
//! - Runs before anything is snapshotted or pushed

mod rules;

pub use rules::{validate, validate_value, HandlerError, ListenError, ValidationError};
