//! Render-state enumerants, their encodings, and the GL translation.

use crate::coords::{Color, Viewport};
use crate::gl::GlDriver;

/// Encoded `true` for boolean render states.
pub const TRUE: u32 = 1;
/// Encoded `false` for boolean render states.
pub const FALSE: u32 = 0;

#[inline]
pub fn encode_bool(value: bool) -> u32 {
    if value { TRUE } else { FALSE }
}

/// Named pipeline settings tracked by the state table.
///
/// The discriminant is the table index and the raw enumerant accepted by
/// `RenderContext::set_render_state_raw`.
#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RenderState {
    AlphaTest,
    AlphaTestFunc,
    AlphaTestRef,
    Blend,
    BlendSrc,
    BlendDst,
    BlendOp,
    DepthWrite,
    DepthTest,
    DepthFunc,
    /// Depth clear value, encoded as the bits of an `f32`.
    DepthClearValue,
    CullMode,
    DepthBias,
    Multisample,
}

impl RenderState {
    pub const COUNT: usize = 14;

    pub const ALL: [RenderState; Self::COUNT] = [
        RenderState::AlphaTest,
        RenderState::AlphaTestFunc,
        RenderState::AlphaTestRef,
        RenderState::Blend,
        RenderState::BlendSrc,
        RenderState::BlendDst,
        RenderState::BlendOp,
        RenderState::DepthWrite,
        RenderState::DepthTest,
        RenderState::DepthFunc,
        RenderState::DepthClearValue,
        RenderState::CullMode,
        RenderState::DepthBias,
        RenderState::Multisample,
    ];

    /// Returns `None` when `raw` is outside the declared range.
    #[inline]
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

macro_rules! gl_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $gl:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(u32)]
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Decodes a table value; `None` if it is not a valid encoding.
            #[inline]
            pub fn from_raw(raw: u32) -> Option<Self> {
                Self::ALL.get(raw as usize).copied()
            }

            #[inline]
            pub fn raw(self) -> u32 {
                self as u32
            }

            /// Equivalent GL enumerant.
            #[inline]
            pub fn to_gl(self) -> u32 {
                match self {
                    $($name::$variant => $gl),+
                }
            }
        }

        impl From<$name> for u32 {
            #[inline]
            fn from(value: $name) -> u32 {
                value as u32
            }
        }
    };
}

gl_enum! {
    /// Blend factor for `BlendSrc` / `BlendDst`.
    pub enum BlendFactor {
        Zero => glow::ZERO,
        One => glow::ONE,
        Src => glow::SRC_COLOR,
        SrcAlpha => glow::SRC_ALPHA,
        Dst => glow::DST_COLOR,
        DstAlpha => glow::DST_ALPHA,
        OneMinusSrc => glow::ONE_MINUS_SRC_COLOR,
        OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        OneMinusDst => glow::ONE_MINUS_DST_COLOR,
        OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
    }
}

gl_enum! {
    /// Blend equation for `BlendOp`.
    pub enum BlendOp {
        Add => glow::FUNC_ADD,
        Subtract => glow::FUNC_SUBTRACT,
        ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
        Min => glow::MIN,
        Max => glow::MAX,
    }
}

gl_enum! {
    /// Face culling for `CullMode`. `None` disables `CULL_FACE`.
    pub enum CullMode {
        None => glow::NONE,
        Front => glow::FRONT,
        Back => glow::BACK,
        FrontAndBack => glow::FRONT_AND_BACK,
    }
}

gl_enum! {
    /// Depth comparison for `DepthFunc`.
    pub enum CompareFunc {
        Never => glow::NEVER,
        Less => glow::LESS,
        Equal => glow::EQUAL,
        LessEqual => glow::LEQUAL,
        Greater => glow::GREATER,
        NotEqual => glow::NOTEQUAL,
        GreaterEqual => glow::GEQUAL,
        Always => glow::ALWAYS,
    }
}

/// Buffers selected by `RenderContext::clear`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct ClearMask(u32);

impl ClearMask {
    pub const COLOR: ClearMask = ClearMask(1 << 0);
    pub const DEPTH: ClearMask = ClearMask(1 << 1);
    pub const STENCIL: ClearMask = ClearMask(1 << 2);
    pub const ALL: ClearMask = ClearMask(0b111);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: ClearMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// GL `clear` bitmask for the selected buffers.
    pub fn to_gl(self) -> u32 {
        let mut mask = 0;
        if self.contains(Self::COLOR) {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if self.contains(Self::DEPTH) {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        if self.contains(Self::STENCIL) {
            mask |= glow::STENCIL_BUFFER_BIT;
        }
        mask
    }
}

impl std::ops::BitOr for ClearMask {
    type Output = ClearMask;

    #[inline]
    fn bitor(self, rhs: ClearMask) -> ClearMask {
        ClearMask(self.0 | rhs.0)
    }
}

/// Current value of every tracked render state.
///
/// Owned by a `RenderContext`; mirrors what the GPU holds after the last call
/// through that context.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStateTable {
    values: [u32; RenderState::COUNT],
    clear_color: Color,
    viewport: Viewport,
}

impl RenderStateTable {
    /// Table holding the GL defaults for a freshly created context.
    pub fn new(viewport: Viewport) -> Self {
        let mut values = [0; RenderState::COUNT];
        values[RenderState::Blend.index()] = FALSE;
        values[RenderState::BlendSrc.index()] = BlendFactor::One.raw();
        values[RenderState::BlendDst.index()] = BlendFactor::Zero.raw();
        values[RenderState::BlendOp.index()] = BlendOp::Add.raw();
        values[RenderState::DepthWrite.index()] = TRUE;
        values[RenderState::DepthTest.index()] = FALSE;
        values[RenderState::DepthFunc.index()] = CompareFunc::Less.raw();
        values[RenderState::DepthClearValue.index()] = 1.0f32.to_bits();
        values[RenderState::CullMode.index()] = CullMode::None.raw();
        values[RenderState::Multisample.index()] = TRUE;

        Self {
            values,
            clear_color: Color::transparent(),
            viewport,
        }
    }

    #[inline]
    pub fn get(&self, state: RenderState) -> u32 {
        self.values[state.index()]
    }

    /// Stores `value`; returns `false` if the table already held it.
    #[inline]
    pub(crate) fn set(&mut self, state: RenderState, value: u32) -> bool {
        let slot = &mut self.values[state.index()];
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }

    #[inline]
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub(crate) fn set_clear_color(&mut self, color: Color) -> bool {
        if self.clear_color == color {
            return false;
        }
        self.clear_color = color;
        true
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub(crate) fn set_viewport(&mut self, viewport: Viewport) -> bool {
        if self.viewport == viewport {
            return false;
        }
        self.viewport = viewport;
        true
    }
}

// ── GL translation ────────────────────────────────────────────────────────

fn invalid_value(state: RenderState, value: u32, expected: &str) -> ! {
    log::error!("invalid render state value {value} for {state:?}; expected {expected}");
    panic!("invalid render state value {value} for {state:?}; expected {expected}");
}

fn set_capability(driver: &dyn GlDriver, state: RenderState, cap: u32, value: u32) {
    match value {
        TRUE => driver.enable(cap),
        FALSE => driver.disable(cap),
        _ => invalid_value(state, value, "TRUE or FALSE"),
    }
}

fn blend_factor(state: RenderState, value: u32) -> u32 {
    BlendFactor::from_raw(value)
        .unwrap_or_else(|| invalid_value(state, value, "a blend factor"))
        .to_gl()
}

fn unimplemented_state(state: RenderState) -> ! {
    log::error!("render state {state:?} is not implemented");
    panic!("render state {state:?} is not implemented");
}

/// Panics unless `state` is implemented and `value` is a valid encoding for it.
///
/// Must run before the table is updated, so a rejected value is never stored.
pub(crate) fn validate(state: RenderState, value: u32) {
    let (valid, expected) = match state {
        RenderState::Blend
        | RenderState::DepthWrite
        | RenderState::DepthTest
        | RenderState::Multisample => (matches!(value, TRUE | FALSE), "TRUE or FALSE"),
        RenderState::BlendSrc | RenderState::BlendDst => {
            (BlendFactor::from_raw(value).is_some(), "a blend factor")
        }
        RenderState::BlendOp => (BlendOp::from_raw(value).is_some(), "a blend operation"),
        RenderState::DepthFunc => (CompareFunc::from_raw(value).is_some(), "a compare function"),
        RenderState::DepthClearValue => (
            (0.0..=1.0).contains(&f32::from_bits(value)),
            "the bits of an f32 in [0, 1]",
        ),
        RenderState::CullMode => (CullMode::from_raw(value).is_some(), "a cull mode"),
        RenderState::AlphaTest
        | RenderState::AlphaTestFunc
        | RenderState::AlphaTestRef
        | RenderState::DepthBias => unimplemented_state(state),
    };
    if !valid {
        invalid_value(state, value, expected);
    }
}

/// Issues the GL calls for `state` now holding `value`.
///
/// `table` must already contain the new value; the coupled blend factors read
/// their partner from it.
pub(crate) fn apply(
    driver: &dyn GlDriver,
    table: &RenderStateTable,
    state: RenderState,
    value: u32,
) {
    match state {
        RenderState::Blend => set_capability(driver, state, glow::BLEND, value),

        RenderState::BlendSrc | RenderState::BlendDst => {
            let src = table.get(RenderState::BlendSrc);
            let dst = table.get(RenderState::BlendDst);
            driver.blend_func(
                blend_factor(RenderState::BlendSrc, src),
                blend_factor(RenderState::BlendDst, dst),
            );
        }

        RenderState::BlendOp => {
            let op = BlendOp::from_raw(value)
                .unwrap_or_else(|| invalid_value(state, value, "a blend operation"));
            driver.blend_equation(op.to_gl());
        }

        RenderState::DepthWrite => match value {
            TRUE => driver.depth_mask(true),
            FALSE => driver.depth_mask(false),
            _ => invalid_value(state, value, "TRUE or FALSE"),
        },

        RenderState::DepthTest => set_capability(driver, state, glow::DEPTH_TEST, value),

        RenderState::DepthFunc => {
            let func = CompareFunc::from_raw(value)
                .unwrap_or_else(|| invalid_value(state, value, "a compare function"));
            driver.depth_func(func.to_gl());
        }

        RenderState::DepthClearValue => {
            let depth = f32::from_bits(value);
            if !(0.0..=1.0).contains(&depth) {
                invalid_value(state, value, "the bits of an f32 in [0, 1]");
            }
            driver.clear_depth(depth);
        }

        RenderState::CullMode => {
            let mode = CullMode::from_raw(value)
                .unwrap_or_else(|| invalid_value(state, value, "a cull mode"));
            if mode == CullMode::None {
                driver.disable(glow::CULL_FACE);
            } else {
                driver.enable(glow::CULL_FACE);
                driver.cull_face(mode.to_gl());
            }
        }

        RenderState::Multisample => set_capability(driver, state, glow::MULTISAMPLE, value),

        RenderState::AlphaTest
        | RenderState::AlphaTestFunc
        | RenderState::AlphaTestRef
        | RenderState::DepthBias => unimplemented_state(state),
    }
}
