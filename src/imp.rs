// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Backend glue.  At the moment only wgpu is supported.

#[cfg(feature = "backend_wgpu")]
pub mod wgpu;
