// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Pure per-element kernels shared by the CPU reference path and the
//! accelerator shaders.

pub mod leaky;
pub mod metabolism;

pub use leaky::{leaky_integrate, oscillation_gain};
pub use metabolism::{energy_step, MetabolismParams};
