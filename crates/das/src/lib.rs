// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Analytics event shipping for on-device diagnostic logs.
//!
//! Records are read from a local log stream, parsed into typed [`event::Event`]s,
//! grouped into [`event::Batch`]es and handed to a single [`upload::UploadWorker`]
//! which posts them to the collection endpoint. Failed batches are parked in a
//! bounded [`deferral::DeferralQueue`] and retried after the next successful upload.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batcher;
pub mod config;
pub mod constants;
pub mod deferral;
pub mod error;
pub mod event;
pub mod identity;
pub mod manager;
pub mod parser;
pub mod record;
pub mod source;
pub mod stats;
pub mod transport;
pub mod upload;
pub mod wire;
