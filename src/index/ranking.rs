//! Ranking rules
//!
//! Candidates are compared rule by rule in [`RANKING_RULES`] order; the
//! first rule that tells two hits apart decides. Ties fall back to
//! insertion order so pagination stays stable.

use crate::index::{Document, SortField, SortOrder, SortSpec, SEARCHABLE_ATTRIBUTES};
use std::cmp::Ordering;

/// Gap between two matched terms beyond which proximity stops growing
const MAX_PROXIMITY_GAP: usize = 8;

/// Upper bound on query terms considered
pub const MAX_QUERY_TERMS: usize = 10;

/// A single ranking criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingRule {
    /// More distinct query terms matched ranks higher
    Words,
    /// Fewer approximate (prefix-only) matches ranks higher
    Typo,
    /// Matched terms closer together ranks higher
    Proximity,
    /// A match in a higher-priority attribute ranks higher
    Attribute,
    /// Caller-specified sort
    Sort,
    /// More whole-word matches ranks higher
    Exactness,
}

/// Rule precedence used by the engine
pub const RANKING_RULES: [RankingRule; 6] = [
    RankingRule::Words,
    RankingRule::Typo,
    RankingRule::Proximity,
    RankingRule::Attribute,
    RankingRule::Sort,
    RankingRule::Exactness,
];

/// Lowercased alphanumeric tokens of `text`
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Distinct query terms in query order, capped at [`MAX_QUERY_TERMS`]
pub(crate) fn query_terms(q: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in tokenize(q) {
        if !terms.contains(&token) {
            terms.push(token);
        }
        if terms.len() == MAX_QUERY_TERMS {
            break;
        }
    }
    terms
}

/// Per-document relevance measurements against one query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Signals {
    pub words: usize,
    pub typos: usize,
    pub proximity: usize,
    pub attribute: usize,
    pub exactness: usize,
}

/// Sort keys of one candidate; the document itself is not kept
#[derive(Debug, Clone)]
pub(crate) struct Ranked {
    pub seq: i64,
    pub signals: Signals,
    pub crawled_at_ms: i64,
    pub word_count: u64,
}

impl Ranked {
    /// Measures `document` against `terms` and keeps only what ordering needs
    pub fn of(seq: i64, terms: &[String], document: &Document) -> Self {
        Self {
            seq,
            signals: measure(terms, document),
            crawled_at_ms: document.crawled_at.timestamp_millis(),
            word_count: document.word_count,
        }
    }
}

/// Measures how `document` matches `terms`
///
/// Only the last term may match by prefix, mirroring the candidate query.
pub(crate) fn measure(terms: &[String], document: &Document) -> Signals {
    if terms.is_empty() {
        return Signals::default();
    }

    let keywords = document
        .keywords
        .as_ref()
        .map(|k| k.join(" "))
        .unwrap_or_default();
    let attributes: [Vec<String>; 5] = [
        tokenize(&document.title),
        tokenize(document.description.as_deref().unwrap_or("")),
        tokenize(&keywords),
        tokenize(&document.content),
        tokenize(&document.url),
    ];
    debug_assert_eq!(attributes.len(), SEARCHABLE_ATTRIBUTES.len());

    let last = terms.len() - 1;
    let mut signals = Signals {
        attribute: attributes.len(),
        ..Signals::default()
    };

    for (i, term) in terms.iter().enumerate() {
        let exact = attributes.iter().any(|tokens| tokens.contains(term));
        let prefix = !exact
            && i == last
            && attributes
                .iter()
                .any(|tokens| tokens.iter().any(|t| t.starts_with(term.as_str())));

        if exact {
            signals.exactness += 1;
        }
        if exact || prefix {
            signals.words += 1;
        }
        if prefix {
            signals.typos += 1;
        }
    }

    if let Some(best) = attributes
        .iter()
        .position(|tokens| terms.iter().enumerate().any(|(i, term)| matches(tokens, term, i == last)))
    {
        signals.attribute = best;
        signals.proximity = proximity(&attributes[best], terms);
    }

    signals
}

fn matches(tokens: &[String], term: &str, allow_prefix: bool) -> bool {
    tokens
        .iter()
        .any(|t| t == term || (allow_prefix && t.starts_with(term)))
}

/// Sum of gaps between consecutive matched terms' first positions
fn proximity(tokens: &[String], terms: &[String]) -> usize {
    let last = terms.len() - 1;
    let positions: Vec<usize> = terms
        .iter()
        .enumerate()
        .filter_map(|(i, term)| {
            tokens
                .iter()
                .position(|t| t == term || (i == last && t.starts_with(term.as_str())))
        })
        .collect();

    positions
        .windows(2)
        .map(|pair| pair[0].abs_diff(pair[1]).saturating_sub(1).min(MAX_PROXIMITY_GAP))
        .sum()
}

/// Orders two candidates by the ranking rules, best first
pub(crate) fn compare(a: &Ranked, b: &Ranked, sort: Option<SortSpec>) -> Ordering {
    RANKING_RULES
        .iter()
        .map(|rule| compare_by(*rule, a, b, sort))
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| a.seq.cmp(&b.seq))
}

fn compare_by(rule: RankingRule, a: &Ranked, b: &Ranked, sort: Option<SortSpec>) -> Ordering {
    let (sa, sb) = (&a.signals, &b.signals);
    match rule {
        RankingRule::Words => sb.words.cmp(&sa.words),
        RankingRule::Typo => sa.typos.cmp(&sb.typos),
        RankingRule::Proximity => sa.proximity.cmp(&sb.proximity),
        RankingRule::Attribute => sa.attribute.cmp(&sb.attribute),
        RankingRule::Sort => match sort {
            Some(spec) => {
                let ordering = match spec.field {
                    SortField::CrawledAt => a.crawled_at_ms.cmp(&b.crawled_at_ms),
                    SortField::WordCount => a.word_count.cmp(&b.word_count),
                };
                match spec.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            }
            None => Ordering::Equal,
        },
        RankingRule::Exactness => sb.exactness.cmp(&sa.exactness),
    }
}
