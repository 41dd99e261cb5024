use std::fmt;

/// Most numbered buttons shown at once
pub const MAX_PAGE_BUTTONS: u32 = 5;

/// One button of a pagination bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageButton {
    Page { number: u32, current: bool },
    Ellipsis,
}

/// Windowed page-button model.
///
/// At most five numbered buttons centered on the current page, plus a
/// trailing last-page button behind an ellipsis when the window stops
/// short of the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    /// Current page, clamped into `[1, total_pages]`
    pub current: u32,
    /// Contiguous numbered buttons
    pub pages: Vec<u32>,
    /// Trailing last page, when not already in `pages`
    pub last: Option<u32>,
}

impl PageWindow {
    /// Compute the window for `current` of `total_pages`
    pub fn compute(current: u32, total_pages: u32) -> Self {
        if total_pages == 0 {
            return Self {
                current: 0,
                pages: Vec::new(),
                last: None,
            };
        }

        let current = current.clamp(1, total_pages);
        if total_pages <= MAX_PAGE_BUTTONS {
            return Self {
                current,
                pages: (1..=total_pages).collect(),
                last: None,
            };
        }

        let half = MAX_PAGE_BUTTONS / 2;
        let start = current.saturating_sub(half).max(1);
        let end = start.saturating_add(MAX_PAGE_BUTTONS - 1).min(total_pages);
        let start = end.saturating_sub(MAX_PAGE_BUTTONS - 1).max(1);

        Self {
            current,
            pages: (start..=end).collect(),
            last: (end < total_pages).then_some(total_pages),
        }
    }

    /// Whether an ellipsis precedes the trailing last-page button
    pub fn has_ellipsis(&self) -> bool {
        self.last.is_some()
    }

    /// Buttons in display order
    pub fn buttons(&self) -> Vec<PageButton> {
        let mut buttons: Vec<PageButton> = self
            .pages
            .iter()
            .map(|&number| PageButton::Page {
                number,
                current: number == self.current,
            })
            .collect();

        if let Some(last) = self.last {
            buttons.push(PageButton::Ellipsis);
            buttons.push(PageButton::Page {
                number: last,
                current: false,
            });
        }
        buttons
    }
}

impl fmt::Display for PageWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self
            .buttons()
            .into_iter()
            .map(|button| match button {
                PageButton::Page {
                    number,
                    current: true,
                } => format!("[{number}]"),
                PageButton::Page { number, .. } => number.to_string(),
                PageButton::Ellipsis => "...".to_string(),
            })
            .collect();
        f.write_str(&labels.join(" "))
    }
}
