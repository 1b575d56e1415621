//! Historical lineage tracing: reduce a raw neighbor set to one voice per
//! author, ordered chronologically.
//!
//! A lineage answers "who else has expressed this idea, and in what order
//! across history". The reducer pulls a wide candidate pool, keeps each
//! author's single closest match, drops the source's own author, and sorts by
//! publication year with era rank as the fallback when no year is known.


use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::index::{QuoteMetadata, SearchIndex};
use crate::search::search_by_id;

/// Candidate pool pulled before deduplication. Wider than any sensible
/// `max_results` so prolific authors collapsing to one entry still leaves
/// enough distinct voices.
pub const LINEAGE_CANDIDATE_POOL: usize = 50;

/// Default length of a returned lineage.
pub const DEFAULT_LINEAGE_RESULTS: usize = 20;

const UNKNOWN_AUTHOR: &str = "Unknown";

/// Historical era, ordered oldest to newest with `Unknown` last.
///
/// The variant order is the sort order; do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Era {
    Ancient,
    Medieval,
    Renaissance,
    Enlightenment,
    NineteenthCentury,
    TwentiethCentury,
    Contemporary,
    Unknown,
}

impl Era {
    /// Classifies a publication year. Boundaries are inclusive on the upper
    /// side: 1399 is Medieval, 1400 is Renaissance.
    #[inline]
    #[must_use]
    pub fn from_year(year: i32) -> Self {
        match year {
            ..500 => Self::Ancient,
            500..1400 => Self::Medieval,
            1400..1600 => Self::Renaissance,
            1600..1800 => Self::Enlightenment,
            1800..1900 => Self::NineteenthCentury,
            1900..2000 => Self::TwentiethCentury,
            2000.. => Self::Contemporary,
        }
    }

    /// Parses a stored era label. Unrecognized labels map to `Unknown` so
    /// they sort after everything datable.
    #[inline]
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "Ancient" => Self::Ancient,
            "Medieval" => Self::Medieval,
            "Renaissance" => Self::Renaissance,
            "Enlightenment" => Self::Enlightenment,
            "19th Century" => Self::NineteenthCentury,
            "20th Century" => Self::TwentiethCentury,
            "Contemporary" => Self::Contemporary,
            _ => Self::Unknown,
        }
    }

    /// Era of an item: the stored label when present, else classified from
    /// the year, else `Unknown`.
    #[inline]
    #[must_use]
    pub fn of(metadata: &QuoteMetadata) -> Self {
        match (&metadata.era, metadata.year) {
            (Some(label), _) => Self::from_label(label),
            (None, Some(year)) => Self::from_year(year),
            (None, None) => Self::Unknown,
        }
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ancient => "Ancient",
            Self::Medieval => "Medieval",
            Self::Renaissance => "Renaissance",
            Self::Enlightenment => "Enlightenment",
            Self::NineteenthCentury => "19th Century",
            Self::TwentiethCentury => "20th Century",
            Self::Contemporary => "Contemporary",
            Self::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// One entry of a lineage: a quote, its provenance, and how similar it is to
/// the source idea.
#[derive(Debug, Clone, PartialEq)]
pub struct LineageItem {
    pub id: usize,
    pub quote: String,
    pub author: String,
    pub book_title: String,
    pub year: Option<i32>,
    pub era: Era,
    pub similarity: f32,
}

impl LineageItem {
    fn new(id: usize, metadata: &QuoteMetadata, similarity: f32) -> Self {
        Self {
            id,
            quote: metadata.quote.clone(),
            author: metadata.author.clone(),
            book_title: metadata.book_title.clone(),
            year: metadata.year,
            era: Era::of(metadata),
            similarity,
        }
    }
}

/// The source quote plus its chronologically-ordered lineage.
#[derive(Debug, Clone, PartialEq)]
pub struct LineageResult {
    pub source_quote: LineageItem,
    pub lineage: Vec<LineageItem>,
}

/// Traces the lineage of `source_id`: the closest match from every other
/// author, in historical order.
///
/// Returns `None` when `source_id` has no metadata. The sort chain is:
/// ascending year when both sides have one (equal years break by descending
/// similarity), a known year before an unknown one, and era rank then
/// descending similarity when neither has a year.
#[inline]
#[must_use]
pub fn find_lineage(
    index: &SearchIndex<QuoteMetadata>,
    source_id: usize,
    max_results: usize,
) -> Option<LineageResult> {
    let source = index.metadata_of(source_id)?;

    let candidates = search_by_id(index, source_id, LINEAGE_CANDIDATE_POOL, false)
        .expect("source id was just resolved");
    debug!(
        "Lineage for id {}: {} raw candidates",
        source_id,
        candidates.len()
    );

    // One entry per author, keeping the highest-scoring candidate. A missing
    // author label groups under the Unknown sentinel.
    let mut by_author: HashMap<&str, LineageItem> = HashMap::new();
    for result in &candidates {
        let author = author_label(result.metadata);
        let replace = by_author
            .get(author)
            .is_none_or(|existing| result.score > existing.similarity);
        if replace {
            by_author.insert(
                author,
                LineageItem::new(result.id, result.metadata, result.score),
            );
        }
    }

    let source_author = author_label(source);
    let mut lineage: Vec<LineageItem> = by_author
        .into_iter()
        .filter(|(author, _)| *author != source_author)
        .map(|(_, item)| item)
        .collect();

    lineage.sort_by(|a, b| match (a.year, b.year) {
        (Some(ya), Some(yb)) => ya
            .cmp(&yb)
            .then_with(|| b.similarity.total_cmp(&a.similarity)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a
            .era
            .cmp(&b.era)
            .then_with(|| b.similarity.total_cmp(&a.similarity)),
    });
    lineage.truncate(max_results);

    Some(LineageResult {
        source_quote: LineageItem::new(source_id, source, 1.0),
        lineage,
    })
}

fn author_label(metadata: &QuoteMetadata) -> &str {
    if metadata.author.trim().is_empty() {
        UNKNOWN_AUTHOR
    } else {
        &metadata.author
    }
}
