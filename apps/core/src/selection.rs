use crate::model::{EntryKind, ResultEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn step(self) -> i32 {
        match self {
            Self::Up => -1,
            Self::Down => 1,
        }
    }
}

/// Keyboard/pointer focus over the current result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionNavigator {
    index: usize,
    len: usize,
    version: u64,
}

impl SelectionNavigator {
    /// New result set or filter change: back to the first row. Returns `0`
    /// when the highlight moved there from another row.
    pub fn reset(&mut self, len: usize) -> Option<usize> {
        let moved = len > 0 && self.index != 0;
        self.index = 0;
        self.len = len;
        self.version += 1;
        moved.then_some(0)
    }

    /// Returns the new index when it moved.
    pub fn move_selection(&mut self, direction: Direction) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        let next = next_selection_index(self.index, self.len, direction.step());
        self.set(next)
    }

    pub fn hover(&mut self, index: usize) -> Option<usize> {
        if index >= self.len {
            return None;
        }
        self.set(index)
    }

    pub fn selected(&self) -> Option<usize> {
        (self.len > 0).then_some(self.index)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    fn set(&mut self, index: usize) -> Option<usize> {
        if index == self.index {
            return None;
        }
        self.index = index;
        Some(index)
    }
}

pub(crate) fn next_selection_index(current: usize, len: usize, direction: i32) -> usize {
    if len == 0 {
        return 0;
    }

    let max = len - 1;
    if direction < 0 {
        current.saturating_sub(1).min(max)
    } else if direction > 0 {
        (current + 1).min(max)
    } else {
        current.min(max)
    }
}

/// What activating a result row asks the OS to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    OpenFile(String),
    RevealFile(String),
    OpenLink(String),
}

impl Activation {
    pub fn for_entry(entry: &ResultEntry, reveal: bool) -> Self {
        match entry.kind {
            EntryKind::Url => Self::OpenLink(entry.path.clone()),
            _ if reveal => Self::RevealFile(entry.path.clone()),
            _ => Self::OpenFile(entry.path.clone()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OpenFile(_) => "open",
            Self::RevealFile(_) => "reveal",
            Self::OpenLink(_) => "open link",
        }
    }

    pub fn target(&self) -> &str {
        match self {
            Self::OpenFile(path) | Self::RevealFile(path) | Self::OpenLink(path) => path,
        }
    }
}
