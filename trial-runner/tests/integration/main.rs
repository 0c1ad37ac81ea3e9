// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod config;
mod end_to_end;
mod fixtures;
mod listeners;
mod parameterized;
mod repeat;
mod teardown;
mod theory;
mod timeout;
