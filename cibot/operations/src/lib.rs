// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

pub mod branch_sync;
pub mod build;
pub mod event;
pub mod git;
pub mod layout;
pub mod pr_sync;
pub mod request;
pub(crate) mod testing;
pub mod working_copy;
