// Copyright 2024 The s3qa Authors
// SPDX-License-Identifier: Apache-2.0

//! Document-database access for s3qa.
//!
//! Setup details and timing results live in MongoDB. The [`DocumentStore`]
//! trait abstracts one collection; [`MemoryStore`] implements the same
//! semantics in process.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod memory;
pub mod mongo;
pub mod setups;
pub mod timings;

pub use backend::{DocumentStore, UpdateSummary};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use setups::SetupRepository;
pub use timings::{TimingRecord, TimingRepository};
