// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Comparators and difference functors for geometry types from other crates.

pub mod kurbo;
