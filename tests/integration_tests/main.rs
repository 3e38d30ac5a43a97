use std::rc::Rc;

use assert_json_diff::assert_json_eq;
use fxprof_analysis::{
    AnalysisEvent, AnalysisSession, CallTreeFilter, CategoryColor, CategoryHandle, DataSource,
    FuncFlags, FuncIndex, MarkerPayload, Profile, ProfileSelection, Thread, TracingInterval,
    TracingPayload,
};
use serde_json::json;

/// A thread with stacks [A, B], [A, B], [A, B, C], [A, D] sampled at 0-3ms,
/// plus one paired tracing marker.
fn content_thread() -> (Thread, [FuncIndex; 4]) {
    let mut thread = Thread::new("GeckoMain", 100, 1000);
    let func_a = thread.add_func("A", FuncFlags::empty());
    let func_b = thread.add_func("B", FuncFlags::empty());
    let func_c = thread.add_func("C", FuncFlags::empty());
    let func_d = thread.add_func("D", FuncFlags::empty());
    let frame_a = thread.add_frame(func_a, None);
    let frame_b = thread.add_frame(func_b, None);
    let frame_c = thread.add_frame(func_c, None);
    let frame_d = thread.add_frame(func_d, None);
    let stack_a = thread.add_stack(None, frame_a, CategoryHandle::OTHER);
    let stack_ab = thread.add_stack(Some(stack_a), frame_b, CategoryHandle::OTHER);
    let stack_abc = thread.add_stack(Some(stack_ab), frame_c, CategoryHandle::OTHER);
    let stack_ad = thread.add_stack(Some(stack_a), frame_d, CategoryHandle::OTHER);
    thread.add_sample(Some(stack_ab), 0.0, 0.0);
    thread.add_sample(Some(stack_ab), 1.0, 0.0);
    thread.add_sample(Some(stack_abc), 2.0, 0.0);
    thread.add_sample(Some(stack_ad), 3.0, 0.0);
    thread.add_marker(
        "Rasterize",
        0.5,
        Some(MarkerPayload::Tracing(TracingPayload {
            category: Some("Paint".to_string()),
            interval: TracingInterval::Start,
        })),
    );
    thread.add_marker(
        "Rasterize",
        2.5,
        Some(MarkerPayload::Tracing(TracingPayload {
            category: Some("Paint".to_string()),
            interval: TracingInterval::End,
        })),
    );
    (thread, [func_a, func_b, func_c, func_d])
}

fn test_profile() -> (Profile, [FuncIndex; 4]) {
    let (thread, funcs) = content_thread();
    let mut profile = Profile::new("Integration test", 1.0);
    profile.add_category("Other", CategoryColor::Gray);
    profile.add_thread(thread);
    let mut compositor = Thread::new("Compositor", 100, 1001);
    let func = compositor.add_func("Composite", FuncFlags::empty());
    let frame = compositor.add_frame(func, None);
    let stack = compositor.add_stack(None, frame, CategoryHandle::OTHER);
    compositor.add_sample(Some(stack), 0.0, 0.0);
    profile.add_thread(compositor);
    (profile, funcs)
}

#[test]
fn call_tree_follows_the_selected_thread() {
    let (profile, _) = test_profile();
    let mut session = AnalysisSession::new(profile, DataSource::File);
    assert_eq!(session.thread_count(), 2);
    // Compositor sorts after the main thread in the default order.
    assert_eq!(session.thread_order(), &[0, 1]);

    let main_tree = session.call_tree();
    assert_eq!(main_tree.node(main_tree.roots()[0]).name, "A");
    session.set_selected_thread(1);
    let compositor_tree = session.call_tree();
    assert_eq!(
        compositor_tree.node(compositor_tree.roots()[0]).name,
        "Composite"
    );

    // Switching back serves the first thread's tree from cache.
    session.set_selected_thread(0);
    let main_tree_again = session.call_tree();
    assert!(Rc::ptr_eq(&main_tree, &main_tree_again));
}

#[test]
fn derived_views_are_cached_until_an_input_changes() {
    let (profile, _) = test_profile();
    let mut session = AnalysisSession::new(profile, DataSource::File);

    let first = session.call_tree();
    let second = session.call_tree();
    assert!(Rc::ptr_eq(&first, &second));

    // Events that do not feed the call tree leave the cache alone.
    session.handle_event(AnalysisEvent::SelectedMarkerChanged {
        thread_index: 0,
        marker_index: Some(0),
    });
    assert!(Rc::ptr_eq(&first, &session.call_tree()));

    // Setting the same search string again is not an input change.
    session.set_search_string("");
    assert!(Rc::ptr_eq(&first, &session.call_tree()));

    // A real filter change invalidates.
    session.set_search_string("B");
    let filtered = session.call_tree();
    assert!(!Rc::ptr_eq(&first, &filtered));
    // Only the three samples whose stack contains B remain.
    assert_eq!(filtered.root_total_time(), 3.0);

    session.set_search_string("");
    let restored = session.call_tree();
    assert_eq!(restored.root_total_time(), 4.0);
}

#[test]
fn prefix_filter_remaps_selection_and_re_roots_the_tree() {
    let (profile, [func_a, func_b, func_c, _]) = test_profile();
    let mut session = AnalysisSession::new(profile, DataSource::File);

    session.handle_event(AnalysisEvent::SelectedFuncStackChanged {
        thread_index: 0,
        func_path: vec![func_a, func_b, func_c],
    });
    // Ancestors of the selection are expanded.
    let options = session.view_options(0);
    assert!(options.expanded_func_stacks().contains(&vec![func_a]));
    assert!(options
        .expanded_func_stacks()
        .contains(&vec![func_a, func_b]));

    session.handle_event(AnalysisEvent::CallTreeFilterAdded {
        thread_index: 0,
        filter: CallTreeFilter::Prefix {
            func_path: vec![func_a, func_b],
            match_js_only: false,
        },
    });

    // The persisted selection dropped the matched prefix, keeping the
    // boundary function as the new root marker.
    assert_eq!(
        session.view_options(0).selected_func_stack(),
        &[func_b, func_c]
    );

    // The filtered tree is re-rooted at B and still resolves the selection.
    let tree = session.call_tree();
    assert_eq!(tree.node(tree.roots()[0]).name, "B");
    assert_eq!(tree.root_total_time(), 3.0);
    let selected = session.selected_func_stack().expect("selection resolves");
    let info = session.func_stack_info();
    assert_eq!(
        info.func_path_for_func_stack(selected),
        vec![func_b, func_c]
    );
}

#[test]
fn a_selection_invalidated_by_filtering_resolves_to_none() {
    let (profile, [func_a, _, _, func_d]) = test_profile();
    let mut session = AnalysisSession::new(profile, DataSource::File);
    session.handle_event(AnalysisEvent::SelectedFuncStackChanged {
        thread_index: 0,
        func_path: vec![func_a, func_d],
    });
    assert!(session.selected_func_stack().is_some());
    // Inverting rebuilds the func stack tree rooted at the old leaves; the
    // root-first path [A, D] no longer exists there, and resolution yields
    // the no-selection sentinel instead of an error.
    session.set_invert_call_stack(true);
    assert_eq!(session.selected_func_stack(), None);
    session.set_invert_call_stack(false);
    assert!(session.selected_func_stack().is_some());
}

#[test]
fn time_range_selection_filters_the_call_tree_and_markers() {
    let (profile, _) = test_profile();
    let mut session = AnalysisSession::new(profile, DataSource::File);
    assert_eq!(session.call_tree().root_total_time(), 4.0);
    assert_eq!(session.tracing_markers().len(), 1);

    session.handle_event(AnalysisEvent::TimeRangeSelectionUpdated {
        selection: ProfileSelection::Range {
            start: 2.0,
            end: 4.0,
            is_modifying: false,
        },
    });
    assert_eq!(session.call_tree().root_total_time(), 2.0);
    // The Rasterize interval [0.5, 2.5) overlaps the selection.
    assert_eq!(session.selection_filtered_tracing_markers().len(), 1);

    session.handle_event(AnalysisEvent::TimeRangeSelectionUpdated {
        selection: ProfileSelection::Range {
            start: 3.0,
            end: 4.0,
            is_modifying: true,
        },
    });
    assert_eq!(session.selection_filtered_tracing_markers().len(), 0);

    session.handle_event(AnalysisEvent::TimeRangeSelectionUpdated {
        selection: ProfileSelection::None,
    });
    assert_eq!(session.call_tree().root_total_time(), 4.0);
}

#[test]
fn flame_chart_rows_cover_each_depth() {
    let (profile, _) = test_profile();
    let mut session = AnalysisSession::new(profile, DataSource::File);
    assert_eq!(session.flame_chart_max_depth(), 2);
    let rows = session.stack_timing_by_depth();
    assert_eq!(rows.len(), 3);
    // Depth 0 covers the full retained range without gaps.
    assert_eq!(rows[0].start, vec![0.0]);
    assert_eq!(rows[0].end, vec![4.0]);
    // Depth 1: B for samples 0-2, then D.
    assert_eq!(rows[1].start, vec![0.0, 3.0]);
    // Depth 2: just the [A, B, C] sample.
    assert_eq!(rows[2].start, vec![2.0]);
    assert_eq!(rows[2].end, vec![3.0]);

    let overview = session.leaf_category_timing();
    assert_eq!(overview.start, vec![0.0]);
    assert_eq!(overview.end, vec![4.0]);
}

#[test]
fn functions_coalesced_rewrites_frames_and_selection() {
    let (profile, [func_a, func_b, _func_c, func_d]) = test_profile();
    let mut session = AnalysisSession::new(profile, DataSource::File);
    session.handle_event(AnalysisEvent::SelectedFuncStackChanged {
        thread_index: 0,
        func_path: vec![func_a, func_d],
    });

    // Collapse D into B, as symbolication does when two addresses turn out
    // to belong to one function.
    let mut mapping = rustc_hash::FxHashMap::default();
    mapping.insert(func_d, func_b);
    session.handle_event(AnalysisEvent::FunctionsCoalesced {
        thread_index: 0,
        old_func_to_new_func: mapping,
        funcs_renamed: vec![],
    });

    assert_eq!(
        session.view_options(0).selected_func_stack(),
        &[func_a, func_b]
    );
    // The [A, D] sample now aggregates under [A, B]: B's total grows to 4.
    let tree = session.call_tree();
    let root = tree.roots()[0];
    let children: Vec<_> = tree.children(root).iter().map(|&fs| tree.node(fs)).collect();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name, "B");
    assert_eq!(children[0].total_time, 4.0);
    // The selection still resolves after the merge.
    assert!(session.selected_func_stack().is_some());
}

#[test]
fn profile_json_round_trips() {
    let (profile, _) = test_profile();
    let json = serde_json::to_value(&profile).unwrap();
    let back = Profile::from_json_value(json.clone()).unwrap();
    assert_eq!(back, profile);
    assert_json_eq!(serde_json::to_value(&back).unwrap(), json);
}

#[test]
fn thread_tables_serialize_as_columns() {
    let mut thread = Thread::new("Worker", 7, 8);
    let func = thread.add_func("work", FuncFlags::JS);
    let frame = thread.add_frame(func, Some(0x1234));
    let stack = thread.add_stack(None, frame, CategoryHandle::OTHER);
    thread.add_sample(Some(stack), 1.0, 5.0);
    thread.add_marker("DOMEvent", 2.0, None);

    assert_json_eq!(
        serde_json::to_value(&thread).unwrap(),
        json!({
            "name": "Worker",
            "pid": 7,
            "tid": 8,
            "stringTable": ["work", "DOMEvent"],
            "stackTable": { "prefix": [null], "frame": [0], "category": [0] },
            "frameTable": { "func": [0], "address": [0x1234] },
            "funcTable": { "name": [0], "isJS": [true], "resource": [null] },
            "resourceTable": { "name": [] },
            "samples": { "stack": [0], "time": [1.0], "responsiveness": [5.0] },
            "markers": { "name": [1], "time": [2.0], "data": [null] },
        })
    );
}

#[test]
fn loading_a_new_profile_resets_the_session() {
    let (profile, _) = test_profile();
    let mut session = AnalysisSession::new(profile, DataSource::Addon);
    session.set_search_string("B");
    session.set_selected_thread(1);

    let mut thread = Thread::new("Fresh", 1, 1);
    let func = thread.add_func("main", FuncFlags::empty());
    let frame = thread.add_frame(func, None);
    let stack = thread.add_stack(None, frame, CategoryHandle::OTHER);
    thread.add_sample(Some(stack), 0.0, 0.0);
    let mut fresh = Profile::new("Fresh profile", 1.0);
    fresh.add_thread(thread);

    session.handle_event(AnalysisEvent::ProfileLoaded {
        profile: fresh,
        source: DataSource::Web,
    });
    assert_eq!(session.thread_count(), 1);
    assert_eq!(session.selected_thread_index(), 0);
    let tree = session.call_tree();
    assert_eq!(tree.node(tree.roots()[0]).name, "main");
}
