//! Ambient layout context read by widgets

/// Writing direction of the surrounding layout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

impl TextDirection {
    pub fn is_rtl(self) -> bool {
        matches!(self, TextDirection::Rtl)
    }
}

/// Platform the framework is running on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetPlatform {
    #[default]
    Android,
    Fuchsia,
    Ios,
    Linux,
    MacOs,
    Windows,
}

impl TargetPlatform {
    /// Platforms that draw their own native scrollbar
    pub fn has_native_scrollbar(self) -> bool {
        matches!(self, TargetPlatform::Ios)
    }
}
