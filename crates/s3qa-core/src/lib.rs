// Copyright 2024 The s3qa Authors
// SPDX-License-Identifier: Apache-2.0

//! Core types and utilities for the s3qa test suite.
//!
//! This crate provides the building blocks shared by the other s3qa crates:
//! - Suite settings
//! - The error type suites assert against
//! - The password manager and encrypted configuration values
//! - Reading and merging YAML, JSON and database configuration

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod loader;
pub mod secrets;

pub use config::{Config, LogFormat, S3Config};
pub use error::{Error, Result};
pub use loader::{ConfigRequest, Document, SetupSource};
pub use secrets::{PasswordManager, SecretProvider};
