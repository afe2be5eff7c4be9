// Copyright 2024 The s3qa Authors
// SPDX-License-Identifier: Apache-2.0

//! Storage clients driven by the s3qa suites.
//!
//! - [`S3Lib`]: the native SDK client, with bucket, object and tagging
//!   operations
//! - [`command`], [`s3cmd`], [`minio`]: CLI clients run as local processes
//! - [`concurrency`]: launching several clients at once and judging the
//!   combined outcome

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
pub mod concurrency;
pub mod files;
pub mod minio;
pub mod s3cmd;
pub mod sdk;
pub mod tagging;

pub use command::{format_command, run_local_cmd, CommandOutput};
pub use concurrency::{assert_outcomes, evaluate, ClientOutcome, ConcurrentClients, Expectation};
pub use files::create_file;
pub use minio::MinioConfig;
pub use s3cmd::S3CmdFormatter;
pub use sdk::S3Lib;
