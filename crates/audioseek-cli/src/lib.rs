//! audioseek CLI library
//!
//! Orchestration for the `audioseek` binary:
//!
//! - [`pipeline`] - the build path: files through segmentation, cached
//!   embedding, and one aligned index add
//! - [`query`] - the query path: a text or audio request embedded into the
//!   index's vector space and searched
//! - [`commands`] - the build/query command implementations behind the
//!   clap surface

pub mod commands;
pub mod pipeline;
pub mod query;
