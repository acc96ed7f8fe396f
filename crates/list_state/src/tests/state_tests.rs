use super::*;

fn state_with(total: u64, limit: u32) -> ListState<u32, FilterMap> {
    let mut state = ListState::from_init(&ListInit::new(FilterMap::new()).with_limit(limit));
    state.total = total;
    state
}

#[test]
fn total_pages_rounds_up() {
    assert_eq!(state_with(45, 10).total_pages(), 5);
    assert_eq!(state_with(40, 10).total_pages(), 4);
    assert_eq!(state_with(1, 10).total_pages(), 1);
    assert_eq!(state_with(0, 10).total_pages(), 0);
}

#[test]
fn toggling_sort_flips_only_the_active_field() {
    let first = SortConfig::toggled(None, "name");
    assert_eq!(first, SortConfig::asc("name"));
    let second = SortConfig::toggled(Some(&first), "name");
    assert_eq!(second, SortConfig::desc("name"));
    let other = SortConfig::toggled(Some(&second), "email");
    assert_eq!(other, SortConfig::asc("email"));
}

#[test]
fn filter_map_skips_blank_values_in_query() {
    let mut filters = FilterMap::from([
        ("status".to_string(), "pending".to_string()),
        ("search".to_string(), "  ".to_string()),
    ]);
    let patch = FilterMap::from([("hostel".to_string(), " east ".to_string())]);
    filters.merge_patch(patch);
    assert_eq!(
        filters.query_pairs(),
        vec![
            ("hostel".to_string(), "east".to_string()),
            ("status".to_string(), "pending".to_string()),
        ]
    );
}

#[test]
fn page_request_carries_server_sort_and_filters() {
    let init = ListInit::new(FilterMap::from([("status".to_string(), "open".to_string())]))
        .with_page(2)
        .with_limit(25)
        .with_sort(SortConfig::desc("created_at"));
    let state: ListState<u32, FilterMap> = ListState::from_init(&init);

    assert_eq!(
        state.page_request().query_pairs(),
        vec![
            ("page".to_string(), "2".to_string()),
            ("limit".to_string(), "25".to_string()),
            ("sortField".to_string(), "created_at".to_string()),
            ("sortDirection".to_string(), "desc".to_string()),
            ("status".to_string(), "open".to_string()),
        ]
    );
}

#[test]
fn client_sort_mode_keeps_sort_out_of_the_request() {
    let init = ListInit::new(())
        .with_sort(SortConfig::asc("name"))
        .with_sort_mode(SortMode::Client);
    let state: ListState<u32, ()> = ListState::from_init(&init);
    let request = state.page_request();
    assert_eq!(request.sort_field, None);
    assert_eq!(request.sort_direction, None);
}

#[test]
fn visible_items_are_unsorted_in_server_mode() {
    let mut state: ListState<serde_json::Value, ()> =
        ListState::from_init(&ListInit::new(()).with_sort(SortConfig::asc("v")));
    state.items = vec![serde_json::json!({"v": 2}), serde_json::json!({"v": 1})];
    assert_eq!(state.visible_items(), state.items);
}

#[test]
fn fresh_state_is_idle_without_error() {
    let state = state_with(0, 10);
    assert_eq!(state.status(), ListStatus::Idle);
    assert_eq!(state.error(), None);
    assert!(!state.has_previous_page());
    assert!(!state.has_next_page());
}
