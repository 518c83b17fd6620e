//! Aspects and cell values.
//!
//! A single cell (one column of one entity) can hold several values at
//! once, each under a different [`Aspect`]: the text shown to the user, the
//! value handed to an editor, a tooltip, the item flags, and so on.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

/// Named facet of a cell's value.
///
/// # Standard Aspects
///
/// - **Display**: The primary text to show. This is the primary aspect:
///   a cell store's length is the number of columns it holds under it.
/// - **Decoration**: Icon or image key shown alongside text
/// - **Edit**: Value for editing (may differ from display text)
/// - **ToolTip**, **StatusTip**, **WhatsThis**: Help texts
/// - **AccessibleText**, **AccessibleDescription**: Screen reader texts
/// - **CheckState**: Checkbox state
/// - **Flags**: [`ItemFlags`] for the column
/// - **User(n)**: Application-specific data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Aspect {
    #[default]
    Display,
    Decoration,
    Edit,
    ToolTip,
    StatusTip,
    WhatsThis,
    AccessibleText,
    AccessibleDescription,
    CheckState,
    Flags,
    User(u32),
}

impl Aspect {
    /// The aspect used when none is given.
    pub const PRIMARY: Aspect = Aspect::Display;

    /// Returns `true` if this is a user-defined aspect.
    #[inline]
    pub fn is_user(&self) -> bool {
        matches!(self, Aspect::User(_))
    }

    /// Returns the numeric value of this aspect.
    ///
    /// Standard aspects have fixed values 0-255, user aspects 256 and up.
    pub fn value(&self) -> u32 {
        match self {
            Aspect::Display => 0,
            Aspect::Decoration => 1,
            Aspect::Edit => 2,
            Aspect::ToolTip => 3,
            Aspect::StatusTip => 4,
            Aspect::WhatsThis => 5,
            Aspect::AccessibleText => 6,
            Aspect::AccessibleDescription => 7,
            Aspect::CheckState => 8,
            Aspect::Flags => 9,
            Aspect::User(n) => 256 + n,
        }
    }

    /// Inverse of [`value`](Self::value). Reserved values (10-255) map to `None`.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Aspect::Display),
            1 => Some(Aspect::Decoration),
            2 => Some(Aspect::Edit),
            3 => Some(Aspect::ToolTip),
            4 => Some(Aspect::StatusTip),
            5 => Some(Aspect::WhatsThis),
            6 => Some(Aspect::AccessibleText),
            7 => Some(Aspect::AccessibleDescription),
            8 => Some(Aspect::CheckState),
            9 => Some(Aspect::Flags),
            10..=255 => None,
            n => Some(Aspect::User(n - 256)),
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aspect::User(n) => write!(f, "User({n})"),
            other => write!(f, "{other:?}"),
        }
    }
}

bitflags! {
    /// What a user may do with a cell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ItemFlags: u32 {
        /// Item can be selected.
        const SELECTABLE = 1 << 0;
        /// Item can be edited.
        const EDITABLE = 1 << 1;
        /// Item can be dragged.
        const DRAG_ENABLED = 1 << 2;
        /// Item can receive drops.
        const DROP_ENABLED = 1 << 3;
        /// Item has a checkbox.
        const CHECKABLE = 1 << 4;
        /// Item is enabled (can interact).
        const ENABLED = 1 << 5;
        /// Item has a tri-state checkbox.
        const TRISTATE = 1 << 6;
        /// Item should never have children.
        const NEVER_HAS_CHILDREN = 1 << 7;
    }
}

impl Default for ItemFlags {
    /// Enabled and selectable.
    fn default() -> Self {
        ItemFlags::ENABLED | ItemFlags::SELECTABLE
    }
}

/// Check state for checkable items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckState {
    #[default]
    Unchecked,
    PartiallyChecked,
    Checked,
}

impl CheckState {
    /// Returns `true` if the item is checked (fully or partially).
    pub fn is_checked(&self) -> bool {
        !matches!(self, CheckState::Unchecked)
    }

    /// Toggles between Unchecked and Checked.
    /// PartiallyChecked becomes Unchecked.
    pub fn toggle(&self) -> CheckState {
        match self {
            CheckState::Unchecked => CheckState::Checked,
            CheckState::PartiallyChecked | CheckState::Checked => CheckState::Unchecked,
        }
    }
}

/// A value stored in one (aspect, column) slot.
///
/// Values are cheap to clone. `Custom` holds shared opaque data (for
/// instance a vector type owned by a math library) and compares by
/// identity, so an edit that swaps in a different allocation is never
/// mistaken for a no-op.
#[derive(Clone, Default)]
pub enum CellValue {
    #[default]
    None,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Flags(ItemFlags),
    CheckState(CheckState),
    /// Fixed-size numeric data such as a position or a color.
    Floats(Vec<f64>),
    Custom(Arc<dyn Any + Send + Sync>),
}

impl CellValue {
    /// Wrap an arbitrary value.
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        CellValue::Custom(Arc::new(value))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, CellValue::None)
    }

    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            CellValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Floats, with integers widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            CellValue::Float(n) => Some(*n),
            CellValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<ItemFlags> {
        match self {
            CellValue::Flags(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_check_state(&self) -> Option<CheckState> {
        match self {
            CellValue::CheckState(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            CellValue::Floats(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow custom data as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            CellValue::Custom(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Plain-text rendering used by text filters and debug output.
    ///
    /// Returns `None` for values with no natural text form.
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::String(s) => Some(s.clone()),
            CellValue::Int(n) => Some(n.to_string()),
            CellValue::Float(n) => Some(n.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::None, CellValue::None) => true,
            (CellValue::String(a), CellValue::String(b)) => a == b,
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            // Bitwise, so NaN equals itself.
            (CellValue::Float(a), CellValue::Float(b)) => a.to_bits() == b.to_bits(),
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::Flags(a), CellValue::Flags(b)) => a == b,
            (CellValue::CheckState(a), CellValue::CheckState(b)) => a == b,
            (CellValue::Floats(a), CellValue::Floats(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (CellValue::Custom(a), CellValue::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::None => write!(f, "None"),
            CellValue::String(s) => f.debug_tuple("String").field(s).finish(),
            CellValue::Int(n) => f.debug_tuple("Int").field(n).finish(),
            CellValue::Float(n) => f.debug_tuple("Float").field(n).finish(),
            CellValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            CellValue::Flags(flags) => f.debug_tuple("Flags").field(flags).finish(),
            CellValue::CheckState(s) => f.debug_tuple("CheckState").field(s).finish(),
            CellValue::Floats(v) => f.debug_tuple("Floats").field(v).finish(),
            CellValue::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Int(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Int(n as i64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Float(n)
    }
}

impl From<f32> for CellValue {
    fn from(n: f32) -> Self {
        CellValue::Float(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<ItemFlags> for CellValue {
    fn from(flags: ItemFlags) -> Self {
        CellValue::Flags(flags)
    }
}

impl From<CheckState> for CellValue {
    fn from(state: CheckState) -> Self {
        CellValue::CheckState(state)
    }
}

impl From<Vec<f64>> for CellValue {
    fn from(v: Vec<f64>) -> Self {
        CellValue::Floats(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::None, Into::into)
    }
}
