//! Pointer drag of a socket group within its plate.
//!
//! `idle -> dragging -> idle`. Every move produces feedback; only moves the
//! validator accepts are written to the socket store.

use log::debug;

use crate::geometry::{anchor_to_edge, clamp_edge, edge_to_anchor, group_size};
use crate::layout::{Layout, ViewTransform};
use crate::models::{GroupPatch, Plate, Point, SocketGroup};
use crate::placement::{Rejection, validate};
use crate::store::SocketStore;

/// What the shell needs to draw while a drag is in progress.
#[derive(Clone, Debug, PartialEq)]
pub struct DragFeedback {
    pub group_id: String,
    pub plate_index: usize,
    /// Clamped edge offset of the candidate, plate local.
    pub edge: Point,
    pub rejection: Option<Rejection>,
    pub committed: bool,
}

impl DragFeedback {
    pub fn invalid(&self) -> bool {
        self.rejection.is_some()
    }
}

#[derive(Clone, Debug)]
struct ActiveDrag {
    group_id: String,
    plate_index: usize,
    start_px: (f64, f64),
    start_anchor: Point,
    last: DragFeedback,
}

#[derive(Clone, Debug, Default)]
pub struct DragController {
    active: Option<ActiveDrag>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn feedback(&self) -> Option<&DragFeedback> {
        self.active.as_ref().map(|a| &a.last)
    }

    /// Start dragging `group` from the pointer position `pointer_px`.
    /// A drag already in progress is replaced.
    pub fn begin(&mut self, group: &SocketGroup, pointer_px: (f64, f64)) -> &DragFeedback {
        let start_anchor = group.anchor();
        let last = DragFeedback {
            group_id: group.id.clone(),
            plate_index: group.plate_index,
            edge: anchor_to_edge(start_anchor),
            rejection: None,
            committed: false,
        };
        debug!("drag start on group {}", group.id);
        let active = self.active.insert(ActiveDrag {
            group_id: group.id.clone(),
            plate_index: group.plate_index,
            start_px: pointer_px,
            start_anchor,
            last,
        });
        &active.last
    }

    /// Apply a pointer move. Returns `None` when idle, or when the dragged
    /// group vanished or changed plate underneath the drag.
    pub fn update(
        &mut self,
        pointer_px: (f64, f64),
        view: &ViewTransform,
        plates: &[Plate],
        sockets: &mut SocketStore,
    ) -> Option<&DragFeedback> {
        let active = self.active.as_mut()?;
        if !(view.scale > 0.0) {
            return Some(&active.last);
        }
        let self_index = sockets.index_of(&active.group_id)?;
        let group = sockets.groups()[self_index].clone();
        if group.plate_index != active.plate_index {
            return None;
        }
        let plate = plates.get(group.plate_index)?;

        let (dx, dy) = view.delta_to_world(
            pointer_px.0 - active.start_px.0,
            pointer_px.1 - active.start_px.1,
        );
        let start_edge = anchor_to_edge(active.start_anchor);
        let raw = Point {
            x: start_edge.x + dx,
            y: start_edge.y + dy,
        };
        let edge = clamp_edge(raw, plate.width, plate.height, group_size(group.count, group.dir));
        let anchor = edge_to_anchor(edge);
        let candidate = SocketGroup {
            x: anchor.x,
            y: anchor.y,
            ..group
        };

        let verdict = validate(sockets.groups(), self_index, plate, &candidate);
        let committed = verdict.is_ok() && sockets.update_group(&candidate.id, &GroupPatch::anchor(anchor)).is_ok();
        active.last = DragFeedback {
            group_id: candidate.id,
            plate_index: candidate.plate_index,
            edge,
            rejection: verdict.err(),
            committed,
        };
        Some(&active.last)
    }

    /// Finish the drag. Positions committed during moves stay.
    pub fn end(&mut self) -> Option<DragFeedback> {
        let a = self.active.take()?;
        debug!("drag end on group {}", a.group_id);
        Some(DragFeedback {
            rejection: None,
            ..a.last
        })
    }

    /// Abort the drag and put the group back where it started.
    pub fn cancel(&mut self, sockets: &mut SocketStore) {
        let Some(a) = self.active.take() else {
            return;
        };
        let moved = sockets
            .group(&a.group_id)
            .is_some_and(|g| g.anchor() != a.start_anchor);
        if moved {
            let _ = sockets.update_group(&a.group_id, &GroupPatch::anchor(a.start_anchor));
        }
        debug!("drag cancelled on group {}", a.group_id);
    }
}

/// Topmost group whose world rectangle contains `world`.
pub fn group_at<'a>(layout: &Layout, groups: &'a [SocketGroup], world: Point) -> Option<&'a SocketGroup> {
    groups
        .iter()
        .rev()
        .find(|g| layout.group_rect(g).is_some_and(|r| r.contains(world)))
}
