//! Sponsor Auth library
//!
//! This library implements a small authorization-token issuance service used to
//! authorize gasless-transaction sponsorship. A one-time provisioning step
//! (see the `rs256keygen` binary) generates an RSA keypair; the HTTP service
//! then signs time-bounded JWTs binding a caller-supplied sender identity to
//! this deployment's issuer and application identifiers. The resulting token
//! is presented by the caller as a bearer credential to a downstream paymaster
//! service.

pub mod config;
pub mod keys;
pub mod server;
pub mod token;
