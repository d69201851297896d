//! Filter selector decoding.
//!
//! A selector names a subset of a universe (categories, statuses or
//! severities). It is `All`, `Default`, a comma-separated list of positions
//! in the sorted universe, or a comma-separated list of stable keys. Decoding
//! and select-list encoding share [`sorted_universe`], so a position handed
//! out by [`encode_select_list`] always decodes to the same element.

use std::{cmp::Ordering, fmt, str::FromStr};

use serde::Serialize;
use thiserror::Error;

use crate::{category::CategoryTree, models::Category, severity::Severity, status::TicketStatus};

/// Parsed filter selector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selector {
    /// Everything in the universe.
    #[default]
    All,
    /// The universe's default subset.
    Default,
    /// Positions in the sorted universe.
    Indices(Vec<usize>),
    /// Stable keys.
    Keys(Vec<String>),
}

/// Selector decoding failures. All of them are caller input errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// A position is past the end of the universe.
    #[error("selection index {index} is outside 0..{len}")]
    IndexOutOfRange {
        /// Offending position.
        index: usize,
        /// Universe size.
        len: usize,
    },
    /// A key matches nothing in the universe.
    #[error("unknown selection key \"{0}\"")]
    UnknownKey(String),
    /// The selector contains an empty entry such as `1,,2`.
    #[error("empty entry in selector \"{0}\"")]
    EmptyEntry(String),
}

impl Selector {
    /// Parse the textual form. Blank input means [`Selector::All`].
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::EmptyEntry`] when a list contains blanks.
    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        if trimmed.eq_ignore_ascii_case("default") {
            return Ok(Self::Default);
        }
        let entries: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if entries.iter().any(|e| e.is_empty()) {
            return Err(FilterError::EmptyEntry(trimmed.to_owned()));
        }
        let indices: Result<Vec<usize>, _> = entries.iter().map(|e| e.parse::<usize>()).collect();
        Ok(indices.map_or_else(
            |_| Self::Keys(entries.iter().map(|e| (*e).to_owned()).collect()),
            Self::Indices,
        ))
    }

    /// Replace keys using `expand`, keeping keys it does not recognise.
    #[must_use]
    pub fn expand_keys(self, expand: impl Fn(&str) -> Option<Vec<String>>) -> Self {
        match self {
            Self::Keys(keys) => Self::Keys(
                keys.into_iter()
                    .flat_map(|key| expand(&key).unwrap_or_else(|| vec![key]))
                    .collect(),
            ),
            other => other,
        }
    }
}

impl FromStr for Selector {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Default => f.write_str("Default"),
            Self::Indices(indices) => {
                let joined: Vec<String> = indices.iter().map(ToString::to_string).collect();
                f.write_str(&joined.join(","))
            }
            Self::Keys(keys) => f.write_str(&keys.join(",")),
        }
    }
}

/// Something that can be picked by a stable key.
pub trait Selectable {
    /// Identifier that survives inserts and deletes in the universe.
    fn key(&self) -> String;
}

impl Selectable for TicketStatus {
    fn key(&self) -> String { self.name().to_owned() }
}

impl Selectable for Severity {
    fn key(&self) -> String { self.name().to_owned() }
}

/// One option of a rendered select list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayOption {
    /// Position in the sorted universe.
    pub index: usize,
    /// Stable key.
    pub key: String,
    /// Label.
    pub text: String,
    /// Whether the current selector picks this option.
    pub selected: bool,
}

/// Stable sort of `universe` shared by decoding and encoding.
pub fn sorted_universe<T, S>(universe: &[T], sort: S) -> Vec<T>
where
    T: Clone,
    S: FnMut(&T, &T) -> Ordering,
{
    let mut sorted = universe.to_vec();
    sorted.sort_by(sort);
    sorted
}

fn selection_mask<T, D>(selector: &Selector, sorted: &[T], is_default: D) -> Result<Vec<bool>, FilterError>
where
    T: Selectable,
    D: Fn(&T) -> bool,
{
    let len = sorted.len();
    match selector {
        Selector::All => Ok(vec![true; len]),
        Selector::Default => Ok(sorted.iter().map(is_default).collect()),
        Selector::Indices(indices) => {
            let mut mask = vec![false; len];
            for &index in indices {
                let slot = mask
                    .get_mut(index)
                    .ok_or(FilterError::IndexOutOfRange { index, len })?;
                *slot = true;
            }
            Ok(mask)
        }
        Selector::Keys(keys) => {
            let mut mask = vec![false; len];
            let item_keys: Vec<String> = sorted.iter().map(Selectable::key).collect();
            for key in keys {
                let slot = item_keys
                    .iter()
                    .position(|k| k.eq_ignore_ascii_case(key))
                    .and_then(|pos| mask.get_mut(pos))
                    .ok_or_else(|| FilterError::UnknownKey(key.clone()))?;
                *slot = true;
            }
            Ok(mask)
        }
    }
}

/// Decode `selector` against `universe` sorted by `sort`.
///
/// The result keeps sorted order and holds each element at most once.
///
/// # Errors
///
/// Returns [`FilterError`] for out-of-range positions or unknown keys;
/// nothing is clamped.
pub fn decode_selection<T, S, D>(
    selector: &Selector,
    universe: &[T],
    sort: S,
    is_default: D,
) -> Result<Vec<T>, FilterError>
where
    T: Selectable + Clone,
    S: FnMut(&T, &T) -> Ordering,
    D: Fn(&T) -> bool,
{
    let sorted = sorted_universe(universe, sort);
    let mask = selection_mask(selector, &sorted, is_default)?;
    Ok(sorted
        .into_iter()
        .zip(mask)
        .filter_map(|(item, keep)| keep.then_some(item))
        .collect())
}

/// Render `universe` as select-list options, flagging those `selector` picks.
///
/// # Errors
///
/// Returns [`FilterError`] under the same conditions as [`decode_selection`].
pub fn encode_select_list<T, S, F, D>(
    universe: &[T],
    sort: S,
    display: F,
    selector: &Selector,
    is_default: D,
) -> Result<Vec<DisplayOption>, FilterError>
where
    T: Selectable + Clone,
    S: FnMut(&T, &T) -> Ordering,
    F: Fn(&T) -> String,
    D: Fn(&T) -> bool,
{
    let sorted = sorted_universe(universe, sort);
    let mask = selection_mask(selector, &sorted, is_default)?;
    Ok(sorted
        .iter()
        .zip(mask)
        .enumerate()
        .map(|(index, (item, selected))| DisplayOption {
            index,
            key: item.key(),
            text: display(item),
            selected,
        })
        .collect())
}

/// Named status groups accepted as keys.
fn status_preset(key: &str) -> Option<Vec<String>> {
    let range = |from: TicketStatus, to: TicketStatus| {
        TicketStatus::ALL
            .into_iter()
            .filter(|s| *s >= from && *s <= to)
            .map(|s| s.name().to_owned())
            .collect::<Vec<_>>()
    };
    match key.to_ascii_lowercase().as_str() {
        "open" => Some(range(TicketStatus::Submitted, TicketStatus::AwaitingUser)),
        "inprocess" => Some(range(TicketStatus::AssignedInternally, TicketStatus::AwaitingUser)),
        "finished" => Some(range(TicketStatus::Closed, TicketStatus::Rejected)),
        _ => None,
    }
}

fn status_sort(a: &TicketStatus, b: &TicketStatus) -> Ordering { a.cmp(b) }

fn status_default(status: &TicketStatus) -> bool { !status.is_terminal() }

fn severity_sort(a: &Severity, b: &Severity) -> Ordering { a.cmp(b) }

/// Category paired with its display label for selection.
#[derive(Debug, Clone)]
pub struct CategoryEntry {
    /// Underlying category.
    pub category: Category,
    /// Label used for sorting and display.
    pub display_name: String,
}

impl Selectable for CategoryEntry {
    fn key(&self) -> String { self.category.id.clone() }
}

fn category_universe(tree: &CategoryTree) -> Vec<CategoryEntry> {
    tree.live()
        .map(|category| CategoryEntry {
            display_name: tree.display_name(category),
            category: category.clone(),
        })
        .collect()
}

fn category_sort(a: &CategoryEntry, b: &CategoryEntry) -> Ordering {
    a.display_name
        .cmp(&b.display_name)
        .then_with(|| a.category.id.cmp(&b.category.id))
}

/// Raw selectors for the three filter dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    /// Category selector.
    pub categories: Selector,
    /// Status selector.
    pub statuses: Selector,
    /// Severity selector.
    pub severities: Selector,
}

impl FilterCriteria {
    /// Criteria used when the caller supplies none: every category and
    /// severity, non-terminal statuses.
    #[must_use]
    pub const fn landing() -> Self {
        Self {
            categories: Selector::All,
            statuses: Selector::Default,
            severities: Selector::All,
        }
    }

    /// Whether the category selector spans every category, including
    /// soft-deleted ones still referenced by old tickets.
    #[must_use]
    pub const fn spans_all_categories(&self) -> bool {
        matches!(self.categories, Selector::All | Selector::Default)
    }

    /// Parse the three textual selectors.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] when any selector is malformed.
    pub fn parse(categories: &str, statuses: &str, severities: &str) -> Result<Self, FilterError> {
        Ok(Self {
            categories: categories.parse()?,
            statuses: statuses.parse()?,
            severities: severities.parse()?,
        })
    }
}

/// Concrete sets produced from [`FilterCriteria`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedFilter {
    /// Selected category ids; empty when every category matches.
    pub category_ids: Vec<String>,
    /// Selected statuses.
    pub statuses: Vec<TicketStatus>,
    /// Selected severities.
    pub severities: Vec<Severity>,
}

/// Select lists for the three filter dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FilterDisplay {
    /// Category options.
    pub categories: Vec<DisplayOption>,
    /// Status options.
    pub statuses: Vec<DisplayOption>,
    /// Severity options.
    pub severities: Vec<DisplayOption>,
}

/// Turns filter selectors into concrete sets and select lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterResolver;

impl FilterResolver {
    /// Decode a category selector against live categories sorted by label.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] for bad positions or unknown ids.
    pub fn categories(self, selector: &Selector, tree: &CategoryTree) -> Result<Vec<String>, FilterError> {
        let entries = decode_selection(selector, &category_universe(tree), category_sort, |_| true)?;
        Ok(entries.into_iter().map(|e| e.category.id).collect())
    }

    /// Decode a status selector; `Default` drops terminal statuses.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] for bad positions or unknown names.
    pub fn statuses(self, selector: &Selector) -> Result<Vec<TicketStatus>, FilterError> {
        decode_selection(
            &selector.clone().expand_keys(status_preset),
            &TicketStatus::ALL,
            status_sort,
            status_default,
        )
    }

    /// Decode a severity selector; `Default` keeps everything.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] for bad positions or unknown names.
    pub fn severities(self, selector: &Selector) -> Result<Vec<Severity>, FilterError> {
        decode_selection(selector, &Severity::ALL, severity_sort, |_| true)
    }

    /// Resolve all three dimensions and render their select lists.
    ///
    /// # Errors
    ///
    /// Returns the first [`FilterError`] encountered.
    pub fn resolve(
        self,
        criteria: &FilterCriteria,
        tree: &CategoryTree,
    ) -> Result<(ResolvedFilter, FilterDisplay), FilterError> {
        // an empty id list leaves the category column unfiltered
        let category_ids = if criteria.spans_all_categories() {
            Vec::new()
        } else {
            self.categories(&criteria.categories, tree)?
        };
        let resolved = ResolvedFilter {
            category_ids,
            statuses: self.statuses(&criteria.statuses)?,
            severities: self.severities(&criteria.severities)?,
        };
        let display = FilterDisplay {
            categories: encode_select_list(
                &category_universe(tree),
                category_sort,
                |e| e.display_name.clone(),
                &criteria.categories,
                |_| true,
            )?,
            statuses: encode_select_list(
                &TicketStatus::ALL,
                status_sort,
                |s| s.display_name().to_owned(),
                &criteria.statuses.clone().expand_keys(status_preset),
                status_default,
            )?,
            severities: encode_select_list(
                &Severity::ALL,
                severity_sort,
                ToString::to_string,
                &criteria.severities,
                |_| true,
            )?,
        };
        Ok((resolved, display))
    }
}

#[cfg(test)]
mod tests;
