use serde::{Deserialize, Serialize};
use std::fmt;

/// Colour keywords of the Coordinate Response Measure corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrmColor {
    Blue,
    Red,
    White,
    Green,
}

impl CrmColor {
    pub const ALL: [CrmColor; 4] = [
        CrmColor::Blue,
        CrmColor::Red,
        CrmColor::White,
        CrmColor::Green,
    ];
}

/// Number keyword (1..=8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CrmNumber(u8);

impl CrmNumber {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 8;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = CrmNumber> {
        (Self::MIN..=Self::MAX).map(CrmNumber)
    }
}

impl TryFrom<u8> for CrmNumber {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        CrmNumber::new(value).ok_or_else(|| format!("CRM number {value} outside 1..=8"))
    }
}

impl From<CrmNumber> for u8 {
    fn from(n: CrmNumber) -> u8 {
        n.0
    }
}

/// A colour/number pair, either presented or reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrmToken {
    pub color: CrmColor,
    pub number: CrmNumber,
}

impl CrmToken {
    /// Number of distinct tokens a listener can report
    pub const RESPONSE_SET_SIZE: usize = CrmColor::ALL.len() * CrmNumber::MAX as usize;

    pub fn new(color: CrmColor, number: CrmNumber) -> Self {
        Self { color, number }
    }

    /// A response is scored correct only when both keywords match
    pub fn matches(&self, response: &CrmToken) -> bool {
        self.color == response.color && self.number == response.number
    }

    pub fn cache_id(&self) -> usize {
        let color = CrmColor::ALL
            .iter()
            .position(|c| *c == self.color)
            .unwrap_or_default();
        color * CrmNumber::MAX as usize + (self.number.get() - CrmNumber::MIN) as usize
    }
}

impl fmt::Display for CrmToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}-{}", self.color, self.number.get())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TalkerGender {
    Male,
    Female,
}

impl TalkerGender {
    pub fn opposite(&self) -> Self {
        match self {
            TalkerGender::Male => TalkerGender::Female,
            TalkerGender::Female => TalkerGender::Male,
        }
    }
}

/// Gender of the masker talkers relative to the target talker
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskerRelation {
    SameGender,
    DifferentGender,
}

impl MaskerRelation {
    pub const ALL: [MaskerRelation; 2] =
        [MaskerRelation::SameGender, MaskerRelation::DifferentGender];

    pub fn masker_gender(&self, target: TalkerGender) -> TalkerGender {
        match self {
            MaskerRelation::SameGender => target,
            MaskerRelation::DifferentGender => target.opposite(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MaskerRelation::SameGender => "same",
            MaskerRelation::DifferentGender => "different",
        }
    }
}

impl fmt::Display for MaskerRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(color: CrmColor, number: u8) -> CrmToken {
        CrmToken::new(color, CrmNumber::new(number).unwrap())
    }

    #[test]
    fn both_keywords_must_match() {
        let target = token(CrmColor::Red, 4);
        assert!(target.matches(&token(CrmColor::Red, 4)));
        assert!(!target.matches(&token(CrmColor::Blue, 4)));
        assert!(!target.matches(&token(CrmColor::Red, 5)));
    }

    #[test]
    fn numbers_outside_range_rejected() {
        assert!(CrmNumber::new(0).is_none());
        assert!(CrmNumber::new(9).is_none());
        assert_eq!(CrmNumber::all().count(), 8);
        assert!(serde_json::from_str::<CrmNumber>("9").is_err());
    }

    #[test]
    fn cache_ids_are_unique() {
        let mut ids: Vec<usize> = CrmColor::ALL
            .iter()
            .flat_map(|c| CrmNumber::all().map(move |n| CrmToken::new(*c, n).cache_id()))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), CrmToken::RESPONSE_SET_SIZE);
        assert_eq!(ids.last().copied(), Some(31));
    }

    #[test]
    fn masker_gender_follows_relation() {
        assert_eq!(
            MaskerRelation::SameGender.masker_gender(TalkerGender::Male),
            TalkerGender::Male
        );
        assert_eq!(
            MaskerRelation::DifferentGender.masker_gender(TalkerGender::Male),
            TalkerGender::Female
        );
        assert_eq!(MaskerRelation::DifferentGender.to_string(), "different");
    }
}
