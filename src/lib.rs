// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! LCEVC encoder element.
//!
//! This crate contains the part of an LCEVC encoder element that does not depend on the hosting
//! media pipeline nor on the LCEVC engine doing the actual compression: the parameter surface,
//! the mapping from negotiated formats to engine image descriptions, and the session that owns
//! the engine between `configure` and `stop` and pumps frames through it.
//!
//! The entry point is [`encoder::session::SessionManager`]. Engines are provided through
//! [`encoder::EngineFactory`]; the crate ships the ones under [`backend`].

pub mod backend;
pub mod encoder;
pub mod format;
pub mod params;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Resolution {
    fn from(value: (u32, u32)) -> Self {
        Self {
            width: value.0,
            height: value.1,
        }
    }
}

/// A rational number, used for frame rates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Fraction {
    pub numer: u32,
    pub denom: u32,
}

impl Fraction {
    pub const fn new(numer: u32, denom: u32) -> Self {
        Self { numer, denom }
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Self::new(30, 1)
    }
}

impl std::fmt::Display for Fraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numer, self.denom)
    }
}

/// Layout of a single plane of a frame buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Offset of the first byte of the plane within the buffer.
    pub offset: usize,
    /// Number of bytes between the start of two consecutive rows.
    pub stride: usize,
}
