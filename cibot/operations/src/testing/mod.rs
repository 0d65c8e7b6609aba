// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

#[cfg(test)]
pub mod integration;

#[cfg(test)]
pub mod recording;
