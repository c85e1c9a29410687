use crate::drive::DriveLetter;
use std::collections::BTreeSet;

/// Letters this tool refuses to mount regardless of OS state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterPolicy {
    reserved: BTreeSet<DriveLetter>,
}

impl LetterPolicy {
    pub fn new(reserved: impl IntoIterator<Item = DriveLetter>) -> Self {
        Self {
            reserved: reserved.into_iter().collect(),
        }
    }

    /// A, B and C, plus whatever `SystemDrive` names.
    pub fn system() -> Self {
        let mut reserved: BTreeSet<DriveLetter> = "ABC"
            .chars()
            .filter_map(|c| DriveLetter::new(c).ok())
            .collect();

        if let Some(letter) = std::env::var("SystemDrive")
            .ok()
            .and_then(|value| value.parse::<DriveLetter>().ok())
        {
            reserved.insert(letter);
        }

        Self { reserved }
    }

    pub fn with_reserved(mut self, extra: impl IntoIterator<Item = DriveLetter>) -> Self {
        self.reserved.extend(extra);
        self
    }

    pub fn is_reserved(&self, letter: DriveLetter) -> bool {
        self.reserved.contains(&letter)
    }

    pub fn reserved(&self) -> impl Iterator<Item = DriveLetter> + '_ {
        self.reserved.iter().copied()
    }

    /// Every letter that can ever be mounted, in order.
    pub fn mountable(&self) -> impl Iterator<Item = DriveLetter> + '_ {
        DriveLetter::all().filter(move |letter| !self.is_reserved(*letter))
    }
}

impl Default for LetterPolicy {
    fn default() -> Self {
        Self::system()
    }
}
