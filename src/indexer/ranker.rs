//! Ranker interface contract.
//!
//! The query-time ranker is an external collaborator; the indexer's only
//! obligation is that its output formats stay forward-compatible with a
//! hit-field code the ranker understands. `HitField` types that code as a
//! sum type rather than a bare integer, per the "sets as relevance flags"
//! design note: a hit's field is a tag, not a boolean.

/// The field a positional hit occurred in, encoded by a downstream,
/// out-of-scope enrichment stage as `hit % 10`. The indexer itself never
/// populates field information in the base pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitField {
    Title,
    Body,
    Url,
    Authors,
    Tags,
}

impl HitField {
    /// Decode a hit's low decimal digit into its field, if recognized.
    pub fn from_hit(hit: u32) -> Option<Self> {
        match hit % 10 {
            0 => Some(HitField::Title),
            1 => Some(HitField::Body),
            2 => Some(HitField::Url),
            3 => Some(HitField::Authors),
            5 => Some(HitField::Tags),
            _ => None,
        }
    }

    /// The low decimal digit this field encodes to.
    pub fn digit(self) -> u32 {
        match self {
            HitField::Title => 0,
            HitField::Body => 1,
            HitField::Url => 2,
            HitField::Authors => 3,
            HitField::Tags => 5,
        }
    }
}
