use proptest::prelude::*;
use rstest::{fixture, rstest};

use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Item {
    id: usize,
    weight: u8,
}

impl Selectable for Item {
    fn key(&self) -> String { format!("item-{}", self.id) }
}

fn by_weight(a: &Item, b: &Item) -> Ordering { a.weight.cmp(&b.weight) }

fn by_weight_desc(a: &Item, b: &Item) -> Ordering { b.weight.cmp(&a.weight) }

fn items(weights: &[u8]) -> Vec<Item> {
    weights
        .iter()
        .enumerate()
        .map(|(id, &weight)| Item { id, weight })
        .collect()
}

fn category(id: &str, name: &str, parent: Option<&str>, deleted: bool) -> Category {
    Category {
        id: id.to_owned(),
        name: name.to_owned(),
        parent_category_id: parent.map(str::to_owned),
        primary_contact: "Contact".to_owned(),
        user_name: "owner".to_owned(),
        primary_email: "owner@example.org".to_owned(),
        phone: None,
        deleted,
    }
}

#[fixture]
fn tree() -> CategoryTree {
    CategoryTree::new(vec![
        category("c-it", "IT", None, false),
        category("c-bld", "Buildings", None, false),
        category("c-hvac", "HVAC", Some("c-bld"), false),
        category("c-old", "Archive", None, true),
    ])
}

#[rstest]
#[case("All", Selector::All)]
#[case(" all ", Selector::All)]
#[case("", Selector::All)]
#[case("Default", Selector::Default)]
#[case("0, 2,5", Selector::Indices(vec![0, 2, 5]))]
#[case("Submitted,Closed", Selector::Keys(vec!["Submitted".into(), "Closed".into()]))]
fn parses_selectors(#[case] raw: &str, #[case] expected: Selector) {
    assert_eq!(Selector::parse(raw), Ok(expected));
}

#[rstest]
fn rejects_blank_entries() {
    assert_eq!(
        Selector::parse("1,,2"),
        Err(FilterError::EmptyEntry("1,,2".to_owned()))
    );
}

#[rstest]
fn display_round_trips_selector_text() {
    for raw in ["All", "Default", "0,3", "Low,High"] {
        let selector = Selector::parse(raw).expect("parse");
        assert_eq!(selector.to_string(), raw);
    }
}

#[rstest]
fn out_of_range_index_is_an_error() {
    let universe = items(&[3, 1, 2]);
    let err = decode_selection(&Selector::Indices(vec![3]), &universe, by_weight, |_| true)
        .expect_err("index 3 is out of range");
    assert_eq!(err, FilterError::IndexOutOfRange { index: 3, len: 3 });
}

#[rstest]
fn indices_are_positions_in_sorted_order() {
    let universe = items(&[30, 10, 20]);
    let picked = decode_selection(&Selector::Indices(vec![0, 2]), &universe, by_weight, |_| true)
        .expect("decode");
    let weights: Vec<u8> = picked.iter().map(|i| i.weight).collect();
    assert_eq!(weights, vec![10, 30]);
}

#[rstest]
fn keys_select_by_identity() {
    let universe = items(&[30, 10, 20]);
    let selector = Selector::Keys(vec!["item-2".to_owned()]);
    let picked = decode_selection(&selector, &universe, by_weight, |_| true).expect("decode");
    assert_eq!(picked, vec![Item { id: 2, weight: 20 }]);
}

#[rstest]
fn unknown_key_is_an_error() {
    let universe = items(&[1]);
    let selector = Selector::Keys(vec!["item-9".to_owned()]);
    assert_eq!(
        decode_selection(&selector, &universe, by_weight, |_| true),
        Err(FilterError::UnknownKey("item-9".to_owned()))
    );
}

#[rstest]
fn default_statuses_exclude_terminal_states() {
    let statuses = FilterResolver.statuses(&Selector::Default).expect("decode");
    assert!(!statuses.contains(&TicketStatus::Closed));
    assert!(!statuses.contains(&TicketStatus::Rejected));
    assert!(statuses.contains(&TicketStatus::Submitted));
}

#[rstest]
fn in_process_preset_uses_status_range() {
    let selector = Selector::parse("InProcess").expect("parse");
    let statuses = FilterResolver.statuses(&selector).expect("decode");
    assert_eq!(
        statuses,
        vec![
            TicketStatus::AssignedInternally,
            TicketStatus::AssignedExternally,
            TicketStatus::Monitoring,
            TicketStatus::AwaitingUser,
        ]
    );
}

#[rstest]
fn closed_key_is_not_a_preset() {
    let selector = Selector::parse("Closed").expect("parse");
    assert_eq!(
        FilterResolver.statuses(&selector),
        Ok(vec![TicketStatus::Closed])
    );
}

#[rstest]
fn category_universe_skips_deleted_and_sorts_by_label(tree: CategoryTree) {
    let ids = FilterResolver.categories(&Selector::All, &tree).expect("decode");
    assert_eq!(ids, vec!["c-bld", "c-hvac", "c-it"]);
    let second = FilterResolver
        .categories(&Selector::Indices(vec![1]), &tree)
        .expect("decode");
    assert_eq!(second, vec!["c-hvac"]);
    assert!(FilterResolver.categories(&Selector::Indices(vec![3]), &tree).is_err());
}

#[rstest]
fn resolve_renders_matching_select_lists(tree: CategoryTree) {
    let criteria = FilterCriteria::parse("0", "Default", "High").expect("parse");
    let (resolved, display) = FilterResolver.resolve(&criteria, &tree).expect("resolve");
    assert_eq!(resolved.category_ids, vec!["c-bld"]);
    assert_eq!(resolved.severities, vec![Severity::High]);
    let selected: Vec<&str> = display
        .categories
        .iter()
        .filter(|o| o.selected)
        .map(|o| o.text.as_str())
        .collect();
    assert_eq!(selected, vec!["Buildings - General"]);
    let closed = display
        .statuses
        .iter()
        .find(|o| o.key == "Closed")
        .expect("closed option");
    assert!(!closed.selected);
}

#[rstest]
#[case("All")]
#[case("Default")]
fn spanning_category_selectors_leave_categories_unfiltered(tree: CategoryTree, #[case] raw: &str) {
    let criteria = FilterCriteria::parse(raw, "All", "All").expect("parse");
    let (resolved, display) = FilterResolver.resolve(&criteria, &tree).expect("resolve");
    assert!(resolved.category_ids.is_empty());
    assert_eq!(display.categories.len(), 3);
    assert!(display.categories.iter().all(|o| o.selected));
}

proptest! {
    #[test]
    fn all_returns_sorted_universe(weights in proptest::collection::vec(any::<u8>(), 1..32)) {
        let universe = items(&weights);
        let decoded = decode_selection(&Selector::All, &universe, by_weight, |_| true).expect("decode");
        let mut expected = universe.clone();
        expected.sort_by(by_weight);
        prop_assert_eq!(decoded, expected);
    }

    #[test]
    fn encode_and_decode_agree(
        weights in proptest::collection::vec(any::<u8>(), 1..32),
        picks in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
        descending in any::<bool>(),
    ) {
        let universe = items(&weights);
        let indices: Vec<usize> = picks.iter().map(|p| p.index(universe.len())).collect();
        let selector = Selector::Indices(indices);
        let sort = if descending { by_weight_desc } else { by_weight };
        let decoded = decode_selection(&selector, &universe, sort, |_| true).expect("decode");
        let options = encode_select_list(&universe, sort, |i| i.weight.to_string(), &selector, |_| true)
            .expect("encode");
        let flagged: Vec<String> = options.iter().filter(|o| o.selected).map(|o| o.key.clone()).collect();
        let decoded_keys: Vec<String> = decoded.iter().map(Selectable::key).collect();
        prop_assert_eq!(flagged, decoded_keys);
    }
}
