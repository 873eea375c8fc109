use std::fmt::{self, Formatter};

/// Panel size reported by the photo frame, in pixels.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct PanelDimensions {
    width: u16,
    height: u16,
}

impl PanelDimensions {
    /// Creates panel dimensions when both values are non-zero.
    ///
    /// ```
    /// use dpf::PanelDimensions;
    ///
    /// let dimensions =
    ///     PanelDimensions::new(320, 240).expect("320x240 should be valid dimensions");
    /// assert_eq!(320, dimensions.width());
    /// assert_eq!(240, dimensions.height());
    /// assert_eq!(None, PanelDimensions::new(0, 240));
    /// ```
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        Some(Self { width, height })
    }

    pub(crate) const fn from_raw(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Returns panel width in pixels.
    #[must_use]
    pub const fn width(self) -> u16 {
        self.width
    }

    /// Returns panel height in pixels.
    #[must_use]
    pub const fn height(self) -> u16 {
        self.height
    }
}

impl fmt::Display for PanelDimensions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
