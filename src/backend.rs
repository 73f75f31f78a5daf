// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Engine backends.
//!
//! A backend provides the [`EngineFactory`] a session builds its engines with. The engines
//! shipped with this crate can be selected by name through [`BuiltinEngine`].

#[cfg(test)]
pub(crate) mod dummy;
pub mod passthrough;
pub mod stub;

use std::str::FromStr;

use crate::encoder::EncoderEngine;
use crate::encoder::EncodingConfiguration;
use crate::encoder::EngineFactory;
use crate::encoder::EngineResult;
use crate::format::ImageDescriptor;

use passthrough::PassthroughFactory;
use stub::StubFactory;

/// One of the engines shipped with this crate.
#[derive(Clone, Debug)]
pub enum BuiltinEngine {
    Stub(StubFactory),
    Passthrough(PassthroughFactory),
}

impl Default for BuiltinEngine {
    fn default() -> Self {
        BuiltinEngine::Stub(Default::default())
    }
}

impl FromStr for BuiltinEngine {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stub" => Ok(BuiltinEngine::Stub(Default::default())),
            "passthrough" => Ok(BuiltinEngine::Passthrough(PassthroughFactory)),
            _ => Err("unrecognized engine. Valid values: stub, passthrough"),
        }
    }
}

impl EngineFactory for BuiltinEngine {
    fn name(&self) -> &'static str {
        match self {
            BuiltinEngine::Stub(f) => f.name(),
            BuiltinEngine::Passthrough(f) => f.name(),
        }
    }

    fn create_engine(
        &mut self,
        descriptor: &ImageDescriptor,
        config: &EncodingConfiguration,
    ) -> EngineResult<Box<dyn EncoderEngine>> {
        match self {
            BuiltinEngine::Stub(f) => f.create_engine(descriptor, config),
            BuiltinEngine::Passthrough(f) => f.create_engine(descriptor, config),
        }
    }
}
