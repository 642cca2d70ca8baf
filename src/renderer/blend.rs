//! Named blend modes and the factor pairs they resolve to.
//!
//! Every registered mode has one pair for premultiplied-alpha sources and one
//! for straight-alpha sources. `AUTO` is never registered: it stands for
//! "inherit from the enclosing state" and must be resolved before lookup.

use std::collections::HashMap;

use crate::error::{RenderError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlendMode(&'static str);

impl BlendMode {
    pub const AUTO: BlendMode = BlendMode("auto");
    pub const NONE: BlendMode = BlendMode("none");
    pub const NORMAL: BlendMode = BlendMode("normal");
    pub const ADD: BlendMode = BlendMode("add");
    pub const MULTIPLY: BlendMode = BlendMode("multiply");
    pub const SCREEN: BlendMode = BlendMode("screen");
    pub const ERASE: BlendMode = BlendMode("erase");
    pub const MASK: BlendMode = BlendMode("mask");
    pub const BELOW: BlendMode = BlendMode("below");

    /// A mode that has to be registered with [`BlendModeRegistry::register`]
    /// before it can be drawn with.
    pub const fn custom(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }

    pub fn is_auto(&self) -> bool {
        *self == Self::AUTO
    }

    /// `self`, or `ambient` when `self` is `AUTO`.
    pub fn resolve(self, ambient: BlendMode) -> BlendMode {
        if self.is_auto() {
            ambient
        } else {
            self
        }
    }
}

impl Default for BlendMode {
    fn default() -> Self {
        Self::AUTO
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Source and destination factor of a blend equation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlendFactors {
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendFactors {
    pub const fn new(src: BlendFactor, dst: BlendFactor) -> Self {
        Self { src, dst }
    }
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    straight: BlendFactors,
    premultiplied: BlendFactors,
}

#[derive(Clone, Debug)]
pub struct BlendModeRegistry {
    modes: HashMap<BlendMode, Entry>,
}

impl Default for BlendModeRegistry {
    fn default() -> Self {
        use BlendFactor::*;

        let mut registry = Self {
            modes: HashMap::new(),
        };
        let f = BlendFactors::new;
        registry.register(BlendMode::NONE, f(One, Zero), f(One, Zero));
        registry.register(
            BlendMode::NORMAL,
            f(SrcAlpha, OneMinusSrcAlpha),
            f(One, OneMinusSrcAlpha),
        );
        registry.register(BlendMode::ADD, f(SrcAlpha, DstAlpha), f(One, One));
        registry.register(
            BlendMode::MULTIPLY,
            f(DstColor, Zero),
            f(DstColor, OneMinusSrcAlpha),
        );
        registry.register(BlendMode::SCREEN, f(SrcAlpha, One), f(One, OneMinusSrcColor));
        registry.register(
            BlendMode::ERASE,
            f(Zero, OneMinusSrcAlpha),
            f(Zero, OneMinusSrcAlpha),
        );
        registry.register(BlendMode::MASK, f(Zero, SrcAlpha), f(Zero, SrcAlpha));
        registry.register(
            BlendMode::BELOW,
            f(OneMinusDstAlpha, DstAlpha),
            f(OneMinusDstAlpha, DstAlpha),
        );
        registry
    }
}

impl BlendModeRegistry {
    /// Register (or replace) a mode.
    pub fn register(
        &mut self,
        mode: BlendMode,
        straight: BlendFactors,
        premultiplied: BlendFactors,
    ) {
        self.modes.insert(
            mode,
            Entry {
                straight,
                premultiplied,
            },
        );
    }

    pub fn contains(&self, mode: BlendMode) -> bool {
        self.modes.contains_key(&mode)
    }

    pub fn factors(&self, mode: BlendMode, premultiplied_alpha: bool) -> Result<BlendFactors> {
        let entry = self
            .modes
            .get(&mode)
            .ok_or_else(|| RenderError::UnknownBlendMode(mode.name().to_string()))?;
        Ok(if premultiplied_alpha {
            entry.premultiplied
        } else {
            entry.straight
        })
    }
}
