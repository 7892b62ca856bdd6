use curator_core::{BoundaryPoint, RasterShape, Region, RegionRegistry};
use curator_state::{
    AcceptancePolicy, Color, CurationConfig, CurationEvent, CurationState, Error, InitialState,
    Mode, SelectionStatus, TracePlotUpdate,
};
use std::sync::Arc;

fn diamond(row: f64, col: f64) -> Vec<BoundaryPoint> {
    vec![
        BoundaryPoint::new(row, col + 1.0),
        BoundaryPoint::new(row + 1.0, col + 2.0),
        BoundaryPoint::new(row + 2.0, col + 1.0),
        BoundaryPoint::new(row + 1.0, col),
    ]
}

fn registry(snr: &[f64]) -> Arc<RegionRegistry> {
    let regions = snr
        .iter()
        .enumerate()
        .map(|(i, &snr)| Region::new(diamond(0.0, 3.0 * i as f64), vec![snr; 5], snr))
        .collect();
    let width = 3 * snr.len().max(1);
    Arc::new(RegionRegistry::new(RasterShape::new(4, width), regions).unwrap())
}

fn state_with(snr: &[f64], initial: InitialState) -> CurationState {
    CurationState::new(registry(snr), initial, CurationConfig::default()).unwrap()
}

fn assert_partition(state: &CurationState) {
    let mut all = state.accepted_ids();
    all.extend(state.rejected_ids());
    all.sort_unstable();
    let expected: Vec<usize> = (0..state.registry().len()).collect();
    assert_eq!(all, expected);
}

#[test]
fn test_accept_reject_partition_holds() {
    let mut state = state_with(&[1.0, 2.0, 3.0, 4.0], InitialState::default());
    assert_partition(&state);

    let events = [
        CurationEvent::SpinboxChange(2),
        CurationEvent::KeyToggle,
        CurationEvent::ModeButton(Mode::Focus),
        CurationEvent::RegionClick(0),
        CurationEvent::KeyToggle,
        CurationEvent::ModeButton(Mode::SnrThreshold),
        CurationEvent::ThresholdDrag(2.5),
        CurationEvent::RegionClick(-1),
        CurationEvent::KeyToggle,
    ];
    for event in &events {
        state.handle(event).unwrap();
        assert_partition(&state);
    }
    assert_eq!(state.rejected_ids(), vec![0, 2]);
}

#[test]
fn test_toggle_twice_restores_state() {
    let mut state = state_with(&[1.0, 2.0, 3.0], InitialState::Flags(vec![true, false, true]));
    let before = state.accepted_flags().to_vec();
    state.toggle(&[0, 1]).unwrap();
    assert_ne!(state.accepted_flags(), before.as_slice());
    state.toggle(&[0, 1]).unwrap();
    assert_eq!(state.accepted_flags(), before.as_slice());
}

#[test]
fn test_selection_never_changes_acceptance() {
    let mut state = state_with(&[1.0, 2.0, 3.0], InitialState::Flags(vec![false, true, true]));
    let before = state.accepted_flags().to_vec();
    state.select(&[0, 2]).unwrap();
    state.select_raw(&[1]).unwrap();
    state.select(&[]).unwrap();
    state.set_mode(Mode::Focus).unwrap();
    assert_eq!(state.accepted_flags(), before.as_slice());
}

#[test]
fn test_final_accept_vector() {
    let mut state = state_with(&[5.0, 1.0, 3.0], InitialState::Flags(vec![true, false, true]));
    state.set_snr_threshold(2.0).unwrap();
    assert_eq!(state.compute_final_accept_vector(), vec![1, 0, 1]);

    let config = CurationConfig::default()
        .with_acceptance(AcceptancePolicy::SnrOnly)
        .with_snr_threshold(2.0);
    let state = CurationState::new(
        registry(&[5.0, 1.0, 3.0]),
        InitialState::AllRejected,
        config,
    )
    .unwrap();
    assert_eq!(state.compute_final_accept_vector(), vec![1, 0, 1]);
}

#[test]
fn test_background_sentinel_clears_selection() {
    let mut state = state_with(&[1.0, 2.0], InitialState::default());
    let update = state.select_raw(&[-1]).unwrap();
    assert!(state.selected().is_empty());
    assert!(update.selection.unwrap().is_cleared());
    assert_eq!(update.traces, Some(TracePlotUpdate::Clear));
}

#[test]
fn test_focus_auto_selects_first_region() {
    let mut state = state_with(&[1.0, 2.0, 3.0], InitialState::default());
    state.select(&[]).unwrap();
    let update = state.set_mode(Mode::Focus).unwrap();
    assert_eq!(state.selected().iter().copied().collect::<Vec<_>>(), vec![0]);

    let accepted = update.accepted_labels.unwrap();
    assert_eq!(accepted[[0, 1]], 1);
    // Region 1 is not selected and stays undrawn.
    assert_eq!(accepted[[0, 4]], 0);
    assert!(update.selection.is_some());
    assert!(matches!(update.traces, Some(TracePlotUpdate::Show(_))));
}

#[test]
fn test_mixed_selection_uses_rejected_color() {
    let mut state = state_with(&[1.0, 2.0], InitialState::Flags(vec![true, false]));
    let update = state.select(&[0, 1]).unwrap();
    let overlay = update.selection.unwrap();
    assert_eq!(overlay.rectangles.len(), 2);
    assert_eq!(overlay.status, Some(SelectionStatus::ContainsRejected));
    assert_eq!(overlay.edge_color, Some(Color::MAGENTA));

    let update = state.toggle(&[1]).unwrap();
    let overlay = update.selection.unwrap();
    assert_eq!(overlay.status, Some(SelectionStatus::AllAccepted));
    assert_eq!(overlay.edge_color, Some(Color::GREEN));
}

#[test]
fn test_failed_event_leaves_state_untouched() {
    let mut state = state_with(&[1.0, 2.0], InitialState::default());
    state.set_mode(Mode::Focus).unwrap();
    let selected = state.selected().clone();

    assert!(state.select(&[1, 9]).is_err());
    assert!(state.set_mode_named("bogus").is_err());
    assert!(state.set_snr_threshold(f64::INFINITY).is_err());

    assert_eq!(state.selected(), &selected);
    assert_eq!(state.mode(), Mode::Focus);
    assert!(state.snr_threshold().abs() < f64::EPSILON);
}

#[test]
fn test_render_failure_leaves_state_untouched() {
    // Region 1 reaches column 4 of a 4-wide raster; the registry is built
    // without validation so the failure surfaces at render time.
    let regions = vec![
        Region::new(diamond(0.0, 0.0), vec![1.0; 3], 2.0),
        Region::new(
            vec![
                BoundaryPoint::new(3.0, 2.0),
                BoundaryPoint::new(3.0, 4.0),
                BoundaryPoint::new(2.0, 3.0),
            ],
            vec![1.0; 3],
            2.0,
        ),
    ];
    let registry = RegionRegistry::new(RasterShape::new(4, 4), regions).unwrap();
    let mut state = CurationState::new(
        Arc::new(registry),
        InitialState::Flags(vec![true, false]),
        CurationConfig::default(),
    )
    .unwrap();
    let out_of_bounds = |err: Error| matches!(err, Error::OutOfBounds { region: 1, .. });

    assert!(out_of_bounds(state.toggle(&[0]).unwrap_err()));
    assert_eq!(state.accepted_flags(), &[true, false]);

    assert!(out_of_bounds(state.set_mode(Mode::SnrThreshold).unwrap_err()));
    assert_eq!(state.mode(), Mode::All);

    // Focus on region 0 only draws in-bounds pixels.
    state.set_mode(Mode::Focus).unwrap();
    assert!(out_of_bounds(state.select(&[1]).unwrap_err()));
    assert_eq!(state.selected().iter().copied().collect::<Vec<_>>(), vec![0]);
    assert_eq!(state.mode(), Mode::Focus);
    assert_eq!(state.accepted_flags(), &[true, false]);
}

#[test]
fn test_empty_registry() {
    let mut state = state_with(&[], InitialState::default());
    assert!(state.selected().is_empty());
    let update = state.set_mode(Mode::Focus).unwrap();
    assert!(state.selected().is_empty());
    assert!(update.selection.is_none());
    assert!(state.compute_final_accept_vector().is_empty());
}
