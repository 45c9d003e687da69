//! # POST /manifests
//!
//! ## Flow
//! 1. Parse the body (`ManifestCreate`)
//! 2. Validate, canonicalize, sign and store through the pipeline
//! 3. Return `201 Created` with the new id
//!
//! The pipeline call is bounded by the configured request timeout. A timed
//! out request drops the pending store write, which then rolls back instead
//! of committing.

mod handler;


pub use handler::handle_create;
