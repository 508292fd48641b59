// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: turning stored image bytes into writable files.

pub mod encoder;

pub use encoder::PixelEncoder;
