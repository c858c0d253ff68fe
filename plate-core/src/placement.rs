//! Placement rules for socket groups and the auto-placement search.

use log::debug;
use thiserror::Error;

use crate::constants::{EDGE_MIN_CM, GROUP_MIN_GAP_CM, SEARCH_STEP_CM, SOCKET_HALF_CM};
use crate::geometry::{group_size, overlaps_with_padding, rect_from_anchor, within_bounds};
use crate::models::{Direction, Plate, Point, SocketGroup};

/// Why a candidate position was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("plate too small: sockets need a plate of at least 40×40 cm")]
    PlateTooSmall,
    #[error("too close to edge: keep at least 3 cm from the plate edges")]
    TooCloseToEdge,
    #[error("too close to another group: keep at least 4 cm between socket groups")]
    TooCloseToGroup,
}

/// Decide whether `candidate` may sit on `plate`.
///
/// `self_index` is the candidate's own position in `all_groups` and is
/// skipped; pass `all_groups.len()` for a group that is not stored yet.
/// Only groups on the candidate's plate are compared. First failure wins.
pub fn validate(
    all_groups: &[SocketGroup],
    self_index: usize,
    plate: &Plate,
    candidate: &SocketGroup,
) -> Result<(), Rejection> {
    if !plate.is_socket_eligible() {
        return Err(Rejection::PlateTooSmall);
    }
    let rect = rect_from_anchor(candidate.x, candidate.y, candidate.count, candidate.dir);
    if !within_bounds(&rect, plate.width, plate.height) {
        return Err(Rejection::TooCloseToEdge);
    }
    let clash = all_groups
        .iter()
        .enumerate()
        .filter(|(i, g)| *i != self_index && g.plate_index == candidate.plate_index)
        .any(|(_, g)| {
            let other = rect_from_anchor(g.x, g.y, g.count, g.dir);
            overlaps_with_padding(&rect, &other, GROUP_MIN_GAP_CM)
        });
    if clash {
        return Err(Rejection::TooCloseToGroup);
    }
    Ok(())
}

/// First free anchor for a new `count`/`dir` group on `plate`, scanning a
/// 0.5 cm grid bottom row first, left to right.
pub fn find_spot_for_new_group(
    plate: &Plate,
    existing_on_plate: &[&SocketGroup],
    count: u8,
    dir: Direction,
) -> Option<Point> {
    let size = group_size(count, dir);
    let min_ax = EDGE_MIN_CM + SOCKET_HALF_CM;
    let max_ax = plate.width - EDGE_MIN_CM - (size.w - SOCKET_HALF_CM);
    let min_ay = EDGE_MIN_CM;
    let max_ay = plate.height - EDGE_MIN_CM - size.h;
    if max_ax + 1e-6 < min_ax || max_ay + 1e-6 < min_ay {
        return None;
    }
    let steps_x = ((max_ax - min_ax + 1e-6) / SEARCH_STEP_CM).floor() as usize;
    let steps_y = ((max_ay - min_ay + 1e-6) / SEARCH_STEP_CM).floor() as usize;

    for iy in 0..=steps_y {
        let ay = min_ay + iy as f64 * SEARCH_STEP_CM;
        for ix in 0..=steps_x {
            let ax = min_ax + ix as f64 * SEARCH_STEP_CM;
            let rect = rect_from_anchor(ax, ay, count, dir);
            if !within_bounds(&rect, plate.width, plate.height) {
                continue;
            }
            let clash = existing_on_plate.iter().any(|g| {
                let r = rect_from_anchor(g.x, g.y, g.count, g.dir);
                overlaps_with_padding(&rect, &r, GROUP_MIN_GAP_CM)
            });
            if !clash {
                return Some(Point { x: ax, y: ay });
            }
        }
    }
    debug!(
        "no free spot for {count} socket(s) on {}×{} plate ({} groups present)",
        plate.width,
        plate.height,
        existing_on_plate.len()
    );
    None
}

/// Index of the first plate that can carry sockets.
pub fn first_eligible_plate(plates: &[Plate]) -> Option<usize> {
    plates.iter().position(Plate::is_socket_eligible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn group(plate_index: usize, x: f64, y: f64) -> SocketGroup {
        SocketGroup {
            id: format!("g-{x}-{y}"),
            plate_index,
            count: 3,
            dir: Direction::Horizontal,
            x,
            y,
        }
    }

    #[test]
    fn accepts_anchor_with_enough_edge_clearance() {
        let plate = Plate::new(100.0, 100.0);
        let g = group(0, 10.0, 3.0);
        assert_eq!(validate(&[g.clone()], 0, &plate, &g), Ok(()));
    }

    #[test]
    fn rejects_anchor_too_close_to_left_edge() {
        let plate = Plate::new(100.0, 100.0);
        let g = group(0, 5.0, 3.0);
        assert_eq!(
            validate(&[g.clone()], 0, &plate, &g),
            Err(Rejection::TooCloseToEdge)
        );
    }

    #[test]
    fn small_plate_is_checked_before_bounds() {
        let plate = Plate::new(120.0, 35.0);
        let g = group(0, 0.0, 0.0);
        assert_eq!(validate(&[], 0, &plate, &g), Err(Rejection::PlateTooSmall));
    }

    #[test]
    fn identical_groups_on_one_plate_collide() {
        let plate = Plate::new(100.0, 100.0);
        let a = group(0, 6.5, 3.0);
        let b = group(0, 6.5, 3.0);
        let all = vec![a, b.clone()];
        assert_eq!(
            validate(&all, 1, &plate, &b),
            Err(Rejection::TooCloseToGroup)
        );
        let moved = SocketGroup {
            x: 33.5,
            ..b.clone()
        };
        assert_eq!(validate(&all, 1, &plate, &moved), Ok(()));
    }

    #[test]
    fn groups_on_other_plates_never_conflict() {
        let plate = Plate::new(100.0, 100.0);
        let a = group(1, 6.5, 3.0);
        let b = group(0, 6.5, 3.0);
        let all = vec![a, b.clone()];
        assert_eq!(validate(&all, 1, &plate, &b), Ok(()));
    }

    #[test]
    fn spot_on_empty_plate_is_the_bottom_left_default() {
        let plate = Plate::new(120.0, 60.0);
        let spot = find_spot_for_new_group(&plate, &[], 3, Direction::Horizontal).unwrap();
        assert_eq!(spot, Point { x: 6.5, y: 3.0 });
    }

    #[test]
    fn spot_skips_past_an_existing_group() {
        let plate = Plate::new(120.0, 60.0);
        let a = group(0, 6.5, 3.0);
        let spot = find_spot_for_new_group(&plate, &[&a], 3, Direction::Horizontal).unwrap();
        // right edge of a is 24.4, plus 4 cm padding
        assert!((spot.x - SOCKET_HALF_CM - 28.4).abs() < 0.5 + 1e-9);
        assert_eq!(spot.y, 3.0);
        let placed = SocketGroup {
            x: spot.x,
            y: spot.y,
            ..group(0, 0.0, 0.0)
        };
        let all = vec![a, placed.clone()];
        assert_eq!(validate(&all, 1, &plate, &placed), Ok(()));
    }

    #[test]
    fn full_plate_yields_none() {
        let plate = Plate::new(40.0, 40.0);
        let mut groups = Vec::new();
        while let Some(p) = {
            let refs: Vec<&SocketGroup> = groups.iter().collect();
            find_spot_for_new_group(&plate, &refs, 3, Direction::Horizontal)
        } {
            groups.push(SocketGroup {
                x: p.x,
                y: p.y,
                ..group(0, 0.0, 0.0)
            });
            assert!(groups.len() < 20);
        }
        assert!(!groups.is_empty());
    }

    #[test]
    fn group_wider_than_plate_has_no_spot() {
        let plate = Plate::new(40.0, 40.0);
        assert_eq!(
            find_spot_for_new_group(&plate, &[], 5, Direction::Horizontal),
            None
        );
    }

    proptest! {
        #[test]
        fn spot_on_empty_eligible_plate_validates(
            w in 40.0f64..300.0,
            h in 40.0f64..128.0,
            count in 1u8..=4,
            vertical in any::<bool>(),
        ) {
            let dir = if vertical { Direction::Vertical } else { Direction::Horizontal };
            let plate = Plate::new(w, h);
            let spot = find_spot_for_new_group(&plate, &[], count, dir);
            prop_assert!(spot.is_some());
            let spot = spot.unwrap();
            let g = SocketGroup { id: "n".into(), plate_index: 0, count, dir, x: spot.x, y: spot.y };
            prop_assert_eq!(validate(&[], 0, &plate, &g), Ok(()));
        }
    }
}
