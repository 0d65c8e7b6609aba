// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

pub mod args;
pub mod entry;
