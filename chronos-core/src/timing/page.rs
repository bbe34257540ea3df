/// One of the two program pages of the timing engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Page {
    /// Page 0.
    #[default]
    P0 = 0,
    /// Page 1.
    P1 = 1,
}

impl Page {
    /// Returns the other page.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Page::P0 => Page::P1,
            Page::P1 => Page::P0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(Page::P1, Page::P0)]
    #[case(Page::P0, Page::P1)]
    fn other(#[case] expect: Page, #[case] page: Page) {
        assert_eq!(expect, page.other());
    }
}
