//! Form-level operations that coordinate the plate and socket stores.
//!
//! Each function takes the stores it touches explicitly. Rejected input never
//! reaches a store; the caller keeps showing the last stored value.

use log::{debug, info};

use crate::geometry::{anchor_to_edge, clamp_edge, edge_range, edge_to_anchor, group_size};
use crate::models::{Dimension, GroupPatch, Plate, Point, SocketGroup, Unit};
use crate::placement::{Rejection, first_eligible_plate, validate};
use crate::store::{PlateStore, SocketError, SocketStore};
use crate::units::{InputError, parse_in_unit};

const EPS: f64 = 1e-6;

/// Axis of a typed edge distance: from the left (`X`) or from the bottom (`Y`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// Remove plate `index` together with its socket groups, renumbering the
/// groups of later plates.
pub fn remove_plate(plates: &mut PlateStore, sockets: &mut SocketStore, index: usize) -> bool {
    if !plates.remove_plate(index) {
        return false;
    }
    sockets.shift_after_plate_removed(index);
    info!("plate {index} removed, {} left", plates.plates().len());
    true
}

/// Commit a typed plate dimension. Out-of-range input is an error rather
/// than being clamped. A new size clears the plate's socket groups.
pub fn commit_dimension(
    plates: &mut PlateStore,
    sockets: &mut SocketStore,
    unit: Unit,
    index: usize,
    dim: Dimension,
    text: &str,
) -> Result<f64, InputError> {
    if plates.plates().get(index).is_none() {
        return Err(InputError::UnknownPlate);
    }
    let cm = parse_in_unit(text, unit)?;
    let (min, max) = dim.range();
    if cm + EPS < min || cm - EPS > max {
        return Err(InputError::OutOfRange { min, max });
    }
    let cm = dim.clamp(cm);
    sockets.clear_for_plate(index);
    plates.update_plate(index, dim, cm);
    Ok(cm)
}

/// Anchor of `g` pulled back inside `plate`'s edge range.
pub fn clamp_anchor(g: &SocketGroup, plate: &Plate) -> Point {
    let edge = clamp_edge(
        anchor_to_edge(g.anchor()),
        plate.width,
        plate.height,
        group_size(g.count, g.dir),
    );
    edge_to_anchor(edge)
}

/// Reconfigure a group. Changing plate, count or direction first clamps the
/// anchor into the new bounds. Rejections go to the store's error slot and
/// leave the group as it was.
pub fn set_group(
    plates: &[Plate],
    sockets: &mut SocketStore,
    id: &str,
    patch: &GroupPatch,
) -> Result<SocketGroup, SocketError> {
    if !sockets.enabled() {
        return Err(SocketError::Disabled);
    }
    let index = sockets
        .index_of(id)
        .ok_or_else(|| SocketError::UnknownGroup(id.to_string()))?;
    let mut candidate = sockets.groups()[index].patched(patch);
    let Some(plate) = plates.get(candidate.plate_index) else {
        let err = SocketError::UnknownPlate(candidate.plate_index);
        sockets.set_error(Some(err.to_string()));
        return Err(err);
    };
    if patch.is_layout_change() {
        let a = clamp_anchor(&candidate, plate);
        candidate.x = a.x;
        candidate.y = a.y;
    }
    if let Err(r) = validate(sockets.groups(), index, plate, &candidate) {
        debug!("group {id} change rejected: {r}");
        sockets.set_error(Some(r.to_string()));
        return Err(r.into());
    }
    sockets.update_group(
        id,
        &GroupPatch {
            plate_index: Some(candidate.plate_index),
            count: Some(candidate.count),
            dir: Some(candidate.dir),
            x: Some(candidate.x),
            y: Some(candidate.y),
        },
    )?;
    if sockets.error().is_some() {
        sockets.set_error(None);
    }
    Ok(candidate)
}

/// Commit a typed edge distance for one axis of a group. Returns the edge
/// distance in centimeters.
pub fn commit_position(
    plates: &[Plate],
    sockets: &mut SocketStore,
    unit: Unit,
    id: &str,
    axis: Axis,
    text: &str,
) -> Result<f64, InputError> {
    let edge = parse_in_unit(text, unit)?;
    let index = sockets
        .index_of(id)
        .ok_or_else(|| SocketError::UnknownGroup(id.to_string()))?;
    let g = sockets.groups()[index].clone();
    let plate = plates.get(g.plate_index).ok_or(InputError::UnknownPlate)?;

    let size = group_size(g.count, g.dir);
    let (min, max) = match axis {
        Axis::X => edge_range(plate.width, size.w),
        Axis::Y => edge_range(plate.height, size.h),
    };
    if edge + EPS < min {
        return Err(InputError::BelowEdgeMinimum);
    }
    if edge - EPS > max {
        return Err(InputError::TooCloseToFarEdge);
    }

    let patch = match axis {
        Axis::X => GroupPatch {
            x: Some(edge_to_anchor(Point { x: edge, y: 0.0 }).x),
            ..Default::default()
        },
        Axis::Y => GroupPatch {
            y: Some(edge),
            ..Default::default()
        },
    };
    validate(sockets.groups(), index, plate, &g.patched(&patch))?;
    sockets.update_group(id, &patch)?;
    if sockets.error().is_some() {
        sockets.set_error(None);
    }
    Ok(edge)
}

/// Switch sockets on or off. Switching on adds one group to the first
/// eligible plate and returns its id.
pub fn toggle_sockets(plates: &[Plate], sockets: &mut SocketStore) -> Result<Option<String>, SocketError> {
    if sockets.enabled() {
        sockets.set_enabled(false, plates)?;
        return Ok(None);
    }
    sockets.set_enabled(true, plates)?;
    let first = first_eligible_plate(plates).ok_or(SocketError::NoEligiblePlate)?;
    sockets.add_group_on(first, plates).map(Some)
}

/// Add another group on the active group's plate, or on the first eligible
/// plate when nothing is active.
pub fn confirm_group(
    plates: &[Plate],
    sockets: &mut SocketStore,
    active_id: Option<&str>,
) -> Result<String, SocketError> {
    if !sockets.enabled() {
        return Err(SocketError::Disabled);
    }
    let target = active_id
        .and_then(|id| sockets.group(id))
        .map(|g| g.plate_index)
        .or_else(|| first_eligible_plate(plates));
    let Some(target) = target else {
        let err = SocketError::NoEligiblePlate;
        sockets.set_error(Some(err.to_string()));
        return Err(err);
    };
    sockets.add_group_on(target, plates)
}

/// Clamp every stored anchor back inside its plate, then re-check each
/// group against the ones kept before it. Groups that still fail (plate now
/// too small, or squeezed into a neighbour) are removed and the first
/// reason goes to the error slot. Returns how many groups moved or were
/// removed.
pub fn normalize_anchors(plates: &[Plate], sockets: &mut SocketStore) -> usize {
    let mut kept: Vec<SocketGroup> = Vec::with_capacity(sockets.groups().len());
    let mut moves: Vec<(String, Point)> = Vec::new();
    let mut dropped: Vec<(String, Rejection)> = Vec::new();
    for g in sockets.groups() {
        let Some(plate) = plates.get(g.plate_index) else {
            kept.push(g.clone());
            continue;
        };
        let a = clamp_anchor(g, plate);
        let candidate = g.patched(&GroupPatch::anchor(a));
        if let Err(r) = validate(&kept, kept.len(), plate, &candidate) {
            dropped.push((g.id.clone(), r));
            continue;
        }
        if (a.x - g.x).abs() > EPS || (a.y - g.y).abs() > EPS {
            moves.push((g.id.clone(), a));
        }
        kept.push(candidate);
    }

    let mut changed = moves
        .iter()
        .filter(|(id, a)| sockets.update_group(id, &GroupPatch::anchor(*a)).is_ok())
        .count();
    for (id, r) in &dropped {
        debug!("group {id} removed after plate change: {r}");
        if sockets.remove_group(id) {
            changed += 1;
        }
    }
    if let Some((_, r)) = dropped.first() {
        info!("{} socket group(s) no longer fit and were removed", dropped.len());
        sockets.set_error(Some(r.to_string()));
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;

    fn enabled(plates: &[Plate]) -> SocketStore {
        let mut s = SocketStore::new();
        s.set_enabled(true, plates).unwrap();
        s
    }

    #[test]
    fn toggle_on_creates_one_group_and_off_clears() {
        let plates = [Plate::new(120.0, 60.0)];
        let mut s = SocketStore::new();
        let id = toggle_sockets(&plates, &mut s).unwrap().unwrap();
        assert!(s.enabled());
        assert_eq!(s.groups().len(), 1);
        let g = s.group(&id).unwrap();
        assert_eq!(g.plate_index, 0);
        assert_eq!(validate(s.groups(), 0, &plates[0], g), Ok(()));

        assert_eq!(toggle_sockets(&plates, &mut s), Ok(None));
        assert!(!s.enabled());
        assert!(s.groups().is_empty());
        assert_eq!(confirm_group(&plates, &mut s, None), Err(SocketError::Disabled));
    }

    #[test]
    fn toggle_without_eligible_plate_fails() {
        let plates = [Plate::new(120.0, 35.0)];
        let mut s = SocketStore::new();
        assert_eq!(toggle_sockets(&plates, &mut s), Err(SocketError::NoEligiblePlate));
        assert!(!s.enabled());
        assert!(s.error().is_some());
    }

    #[test]
    fn removing_a_plate_renumbers_groups() {
        let mut plates = PlateStore::new();
        plates.add_plate();
        plates.add_plate();
        for i in 0..3 {
            plates.update_plate(i, Dimension::Height, 100.0);
        }
        let mut s = enabled(plates.plates());
        let ids: Vec<String> = (0..3)
            .map(|i| s.add_group_on(i, plates.plates()).unwrap())
            .collect();
        assert!(remove_plate(&mut plates, &mut s, 1));
        assert_eq!(plates.plates().len(), 2);
        assert_eq!(s.group(&ids[0]).unwrap().plate_index, 0);
        assert!(s.group(&ids[1]).is_none());
        assert_eq!(s.group(&ids[2]).unwrap().plate_index, 1);
    }

    #[test]
    fn last_plate_cannot_be_removed() {
        let mut plates = PlateStore::new();
        let mut s = SocketStore::new();
        assert!(!remove_plate(&mut plates, &mut s, 0));
    }

    #[test]
    fn dimension_commit_checks_range_and_clears_groups() {
        let mut plates = PlateStore::new();
        plates.update_plate(0, Dimension::Height, 100.0);
        let mut s = enabled(plates.plates());
        s.add_group_on(0, plates.plates()).unwrap();

        let err = commit_dimension(&mut plates, &mut s, Unit::Cm, 0, Dimension::Width, "500");
        assert_eq!(err, Err(InputError::OutOfRange { min: 20.0, max: 300.0 }));
        assert_eq!(s.groups().len(), 1);
        assert_eq!(
            commit_dimension(&mut plates, &mut s, Unit::Cm, 0, Dimension::Width, "x"),
            Err(InputError::InvalidNumber)
        );

        let cm = commit_dimension(&mut plates, &mut s, Unit::Cm, 0, Dimension::Width, "80,5").unwrap();
        assert_eq!(cm, 80.5);
        assert_eq!(plates.plates()[0].width, 80.5);
        assert!(s.groups().is_empty());
    }

    #[test]
    fn dimension_commit_in_inches() {
        let mut plates = PlateStore::new();
        let mut s = SocketStore::new();
        let cm = commit_dimension(&mut plates, &mut s, Unit::In, 0, Dimension::Height, "20").unwrap();
        assert!((cm - 50.8).abs() < 1e-9);
        assert_eq!(
            commit_dimension(&mut plates, &mut s, Unit::In, 3, Dimension::Height, "20"),
            Err(InputError::UnknownPlate)
        );
    }

    #[test]
    fn position_commit_validates_edges_and_neighbours() {
        let plates = [Plate::new(100.0, 100.0)];
        let mut s = enabled(&plates);
        let a = s.add_group_on(0, &plates).unwrap();
        let b = s.add_group_on(0, &plates).unwrap();

        assert_eq!(
            commit_position(&plates, &mut s, Unit::Cm, &b, Axis::X, "2"),
            Err(InputError::BelowEdgeMinimum)
        );
        assert_eq!(
            commit_position(&plates, &mut s, Unit::Cm, &b, Axis::X, "80"),
            Err(InputError::TooCloseToFarEdge)
        );
        assert_eq!(
            commit_position(&plates, &mut s, Unit::Cm, &b, Axis::X, "3"),
            Err(InputError::Placement(Rejection::TooCloseToGroup))
        );
        assert_eq!(commit_position(&plates, &mut s, Unit::Cm, &b, Axis::X, "30"), Ok(30.0));
        assert_eq!(s.group(&b).unwrap().x, 33.5);
        assert_eq!(commit_position(&plates, &mut s, Unit::Cm, &a, Axis::Y, "50"), Ok(50.0));
        assert_eq!(s.group(&a).unwrap().y, 50.0);
        assert!(matches!(
            commit_position(&plates, &mut s, Unit::Cm, "missing", Axis::Y, "5"),
            Err(InputError::Socket(SocketError::UnknownGroup(_)))
        ));
    }

    #[test]
    fn set_group_clamps_anchor_after_layout_change() {
        let plates = [Plate::new(100.0, 100.0)];
        let mut s = enabled(&plates);
        let id = s.add_group_on(0, &plates).unwrap();
        s.update_group(&id, &GroupPatch::anchor(Point { x: 75.0, y: 3.0 }))
            .unwrap();
        // five horizontal sockets need 35.8 cm, so the edge is pulled back to 61.2
        let g = set_group(&plates, &mut s, &id, &GroupPatch { count: Some(5), ..Default::default() })
            .unwrap();
        assert!((g.x - (100.0 - 3.0 - 35.8 + 3.5)).abs() < 1e-9);
        assert_eq!(s.group(&id).unwrap(), &g);

        let g = set_group(&plates, &mut s, &id, &GroupPatch { dir: Some(Direction::Vertical), ..Default::default() })
            .unwrap();
        assert_eq!(g.dir, Direction::Vertical);
        assert_eq!(s.error(), None);
    }

    #[test]
    fn rejected_set_group_keeps_store_and_sets_error() {
        let plates = [Plate::new(100.0, 100.0), Plate::new(30.0, 30.0)];
        let mut s = enabled(&plates);
        let id = s.add_group_on(0, &plates).unwrap();
        let before = s.group(&id).unwrap().clone();
        let err = set_group(&plates, &mut s, &id, &GroupPatch { plate_index: Some(1), ..Default::default() });
        assert_eq!(err, Err(SocketError::Placement(Rejection::PlateTooSmall)));
        assert_eq!(s.group(&id).unwrap(), &before);
        assert!(s.error().is_some());
    }

    #[test]
    fn confirm_uses_active_group_plate() {
        let plates = [Plate::new(100.0, 100.0), Plate::new(100.0, 100.0)];
        let mut s = enabled(&plates);
        let on_second = s.add_group_on(1, &plates).unwrap();
        let id = confirm_group(&plates, &mut s, Some(&on_second)).unwrap();
        assert_eq!(s.group(&id).unwrap().plate_index, 1);
        let id = confirm_group(&plates, &mut s, None).unwrap();
        assert_eq!(s.group(&id).unwrap().plate_index, 0);
    }

    #[test]
    fn normalize_pulls_groups_inside_shrunk_plate() {
        let plates = [Plate::new(100.0, 100.0)];
        let mut s = enabled(&plates);
        let id = s.add_group_on(0, &plates).unwrap();
        s.update_group(&id, &GroupPatch::anchor(Point { x: 90.0, y: 90.0 }))
            .unwrap();
        let shrunk = [Plate::new(60.0, 60.0)];
        assert_eq!(normalize_anchors(&shrunk, &mut s), 1);
        let g = s.group(&id).unwrap();
        assert!((g.x - (60.0 - 3.0 - 21.4 + 3.5)).abs() < 1e-9);
        assert_eq!(g.y, 60.0 - 3.0 - 7.0);
        assert_eq!(normalize_anchors(&shrunk, &mut s), 0);
    }

    #[test]
    fn normalize_drops_groups_that_collide_after_shrink() {
        let mut plates = PlateStore::new();
        plates.update_plate(0, Dimension::Width, 100.0);
        plates.update_plate(0, Dimension::Height, 100.0);
        let mut s = enabled(plates.plates());
        let a = s.add_group_on(0, plates.plates()).unwrap();
        let b = s.add_group_on(0, plates.plates()).unwrap();

        plates.update_plate(0, Dimension::Width, 40.0);
        assert_eq!(normalize_anchors(plates.plates(), &mut s), 1);
        assert!(s.group(&a).is_some());
        assert!(s.group(&b).is_none());
        assert_eq!(s.error(), Some(Rejection::TooCloseToGroup.to_string().as_str()));
        let plate = &plates.plates()[0];
        for (i, g) in s.groups().iter().enumerate() {
            assert_eq!(validate(s.groups(), i, plate, g), Ok(()));
        }

        plates.update_plate(0, Dimension::Height, 35.0);
        normalize_anchors(plates.plates(), &mut s);
        assert!(s.groups().is_empty());
        assert_eq!(s.error(), Some(Rejection::PlateTooSmall.to_string().as_str()));
    }
}
