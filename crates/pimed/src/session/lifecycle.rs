//! Methods the session handles itself.

use std::fmt;

/// Lifecycle requests handled by the session rather than its service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleMethod {
    /// `init`: records the host environment flags.
    Init,
    /// `onActivate`: the host focused the session.
    Activate,
    /// `onDeactivate`: the session lost focus; the active service is released.
    Deactivate,
    /// `onLangProfileActivated`: switch to the service for `guid`.
    LangProfileActivated,
    /// `onLangProfileDeactivated`: the host left the profile `guid`.
    LangProfileDeactivated,
}

impl LifecycleMethod {
    /// Every lifecycle method.
    pub const ALL: [Self; 5] = [
        Self::Init,
        Self::Activate,
        Self::Deactivate,
        Self::LangProfileActivated,
        Self::LangProfileDeactivated,
    ];

    /// Wire name of the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Activate => "onActivate",
            Self::Deactivate => "onDeactivate",
            Self::LangProfileActivated => "onLangProfileActivated",
            Self::LangProfileDeactivated => "onLangProfileDeactivated",
        }
    }

    /// Looks up a lifecycle method by its exact wire name.
    #[must_use]
    pub fn parse(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == method)
    }

    /// Whether the request must carry a profile `guid`.
    #[must_use]
    pub const fn requires_profile(self) -> bool {
        matches!(self, Self::LangProfileActivated | Self::LangProfileDeactivated)
    }
}

impl fmt::Display for LifecycleMethod {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn wire_names_parse_back() {
        for method in LifecycleMethod::ALL {
            assert_eq!(LifecycleMethod::parse(method.as_str()), Some(method));
        }
    }

    #[rstest]
    #[case("onKeyDown")]
    #[case("oninit")]
    #[case("INIT")]
    #[case("")]
    fn other_names_are_not_lifecycle(#[case] method: &str) {
        assert_eq!(LifecycleMethod::parse(method), None);
    }
}
