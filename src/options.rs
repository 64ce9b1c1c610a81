//! Per-write render options.

use std::fmt;

use crate::Value;

/// The options a `write_opt` instruction can carry.
///
/// Each option is stored in a fixed slot of an options array and is rendered
/// to text before the write that consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderOption {
    /// Records the current column so wrapped lines align underneath it.
    Anchor = 0,
    /// The format name handed to the attribute renderer.
    Format = 1,
    /// Text written in place of a missing value.
    Null = 2,
    /// Text written between the elements of a multi-valued attribute.
    Separator = 3,
    /// Text written when the output exceeds the line width.
    Wrap = 4,
}

/// The number of render options.
pub const NUM_OPTIONS: usize = 5;

/// An array of evaluated option values, indexed by [`RenderOption`].
pub(crate) type Options = [Option<Value>; NUM_OPTIONS];

/// An array of option values rendered to text.
pub(crate) type OptionStrings = [Option<String>; NUM_OPTIONS];

impl RenderOption {
    pub const ALL: [RenderOption; NUM_OPTIONS] = [
        RenderOption::Anchor,
        RenderOption::Format,
        RenderOption::Null,
        RenderOption::Separator,
        RenderOption::Wrap,
    ];

    /// Returns the option stored at the given slot.
    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            RenderOption::Anchor => "anchor",
            RenderOption::Format => "format",
            RenderOption::Null => "null",
            RenderOption::Separator => "separator",
            RenderOption::Wrap => "wrap",
        }
    }
}

impl fmt::Display for RenderOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn empty() -> Options {
    Default::default()
}
