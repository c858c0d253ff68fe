//! Plate, socket and unit stores.
//!
//! Each store owns its state, exposes a read-only snapshot, and runs every
//! subscribed listener synchronously after a mutation, before returning.
//! Persistence is just another subscriber.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::MAX_PLATES;
use crate::models::{Dimension, GroupPatch, Plate, SocketGroup, Unit};
use crate::placement::{Rejection, find_spot_for_new_group};

/// Handle returned by `subscribe`; pass it back to `unsubscribe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Listener<T> = Box<dyn FnMut(&T)>;

/// Callback registry notified with the current state.
pub struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Listeners {
            next_id: 1,
            entries: Vec::new(),
        }
    }
}

impl<T> Listeners<T> {
    pub fn subscribe(&mut self, listener: impl FnMut(&T) + 'static) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        Subscription(id)
    }

    pub fn unsubscribe(&mut self, sub: Subscription) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(id, _)| *id != sub.0);
        self.entries.len() != before
    }

    pub fn notify(&mut self, state: &T) {
        for (_, l) in self.entries.iter_mut() {
            l(state);
        }
    }
}

// ---------------------------------------------------------------- plates

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatesState {
    pub plates: Vec<Plate>,
}

impl Default for PlatesState {
    fn default() -> Self {
        PlatesState {
            plates: vec![Plate::default()],
        }
    }
}

impl PlatesState {
    /// Clamp every plate, cap the list length and never leave it empty.
    pub fn sanitized(mut self) -> Self {
        self.plates.truncate(MAX_PLATES);
        for p in self.plates.iter_mut() {
            *p = Plate::new(p.width, p.height);
        }
        if self.plates.is_empty() {
            self.plates.push(Plate::default());
        }
        self
    }
}

/// Canonical ordered list of plates; always 1..=10 entries, always clamped.
#[derive(Default)]
pub struct PlateStore {
    state: PlatesState,
    listeners: Listeners<PlatesState>,
}

impl PlateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: PlatesState) -> Self {
        PlateStore {
            state: state.sanitized(),
            listeners: Listeners::default(),
        }
    }

    pub fn snapshot(&self) -> &PlatesState {
        &self.state
    }

    pub fn plates(&self) -> &[Plate] {
        &self.state.plates
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&PlatesState) + 'static) -> Subscription {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, sub: Subscription) -> bool {
        self.listeners.unsubscribe(sub)
    }

    fn notify(&mut self) {
        self.listeners.notify(&self.state);
    }

    /// Append a default plate. No-op at capacity.
    pub fn add_plate(&mut self) -> bool {
        if self.state.plates.len() >= MAX_PLATES {
            debug!("plate list full ({MAX_PLATES}), add ignored");
            return false;
        }
        self.state.plates.push(Plate::default());
        self.notify();
        true
    }

    /// Remove plate `index`. The last remaining plate is never removed.
    pub fn remove_plate(&mut self, index: usize) -> bool {
        if self.state.plates.len() <= 1 || index >= self.state.plates.len() {
            return false;
        }
        self.state.plates.remove(index);
        self.notify();
        true
    }

    /// Write one dimension of plate `index`, clamped into range.
    pub fn update_plate(&mut self, index: usize, dim: Dimension, value_cm: f64) -> bool {
        let Some(p) = self.state.plates.get_mut(index) else {
            return false;
        };
        let v = dim.clamp(value_cm);
        match dim {
            Dimension::Width => p.width = v,
            Dimension::Height => p.height = v,
        }
        self.notify();
        true
    }
}

// --------------------------------------------------------------- sockets

/// Capacity, eligibility and lookup failures of socket operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SocketError {
    #[error("sockets are disabled")]
    Disabled,
    #[error("no plate of at least 40×40 cm to attach sockets")]
    NoEligiblePlate,
    #[error("no space left for another socket group on this plate")]
    NoFreeSpace,
    #[error("plate {0} does not exist")]
    UnknownPlate(usize),
    #[error("socket group {0} does not exist")]
    UnknownGroup(String),
    #[error(transparent)]
    Placement(#[from] Rejection),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SocketsState {
    pub enabled: bool,
    pub groups: Vec<SocketGroup>,
    /// Last global error message; not persisted.
    #[serde(skip)]
    pub error: Option<String>,
}

#[derive(Default)]
pub struct SocketStore {
    state: SocketsState,
    listeners: Listeners<SocketsState>,
}

impl SocketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: SocketsState) -> Self {
        SocketStore {
            state: SocketsState {
                error: None,
                ..state
            },
            listeners: Listeners::default(),
        }
    }

    pub fn snapshot(&self) -> &SocketsState {
        &self.state
    }

    pub fn groups(&self) -> &[SocketGroup] {
        &self.state.groups
    }

    pub fn enabled(&self) -> bool {
        self.state.enabled
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.state.groups.iter().position(|g| g.id == id)
    }

    pub fn group(&self, id: &str) -> Option<&SocketGroup> {
        self.state.groups.iter().find(|g| g.id == id)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SocketsState) + 'static) -> Subscription {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, sub: Subscription) -> bool {
        self.listeners.unsubscribe(sub)
    }

    fn notify(&mut self) {
        self.listeners.notify(&self.state);
    }

    fn fail(&mut self, err: SocketError) -> SocketError {
        warn!("sockets: {err}");
        self.state.error = Some(err.to_string());
        self.notify();
        err
    }

    /// Turning off drops every group. Turning on needs at least one eligible
    /// plate and keeps any groups already present.
    pub fn set_enabled(&mut self, on: bool, plates: &[Plate]) -> Result<(), SocketError> {
        if !on {
            self.state.enabled = false;
            self.state.groups.clear();
            self.state.error = None;
            self.notify();
            return Ok(());
        }
        if !plates.iter().any(Plate::is_socket_eligible) {
            self.state.enabled = false;
            self.state.groups.clear();
            return Err(self.fail(SocketError::NoEligiblePlate));
        }
        self.state.enabled = true;
        self.state.error = None;
        self.notify();
        Ok(())
    }

    /// Add a default group at the first free spot on `plate_index`.
    pub fn add_group_on(&mut self, plate_index: usize, plates: &[Plate]) -> Result<String, SocketError> {
        let Some(plate) = plates.get(plate_index) else {
            return Err(SocketError::UnknownPlate(plate_index));
        };
        if !self.state.enabled {
            return Err(SocketError::Disabled);
        }
        if !plate.is_socket_eligible() {
            return Err(self.fail(Rejection::PlateTooSmall.into()));
        }
        let mut group = SocketGroup::new(plate_index);
        let existing: Vec<&SocketGroup> = self
            .state
            .groups
            .iter()
            .filter(|g| g.plate_index == plate_index)
            .collect();
        let Some(spot) = find_spot_for_new_group(plate, &existing, group.count, group.dir) else {
            return Err(self.fail(SocketError::NoFreeSpace));
        };
        group.x = spot.x;
        group.y = spot.y;
        let id = group.id.clone();
        debug!("socket group {id} added on plate {plate_index} at ({}, {})", spot.x, spot.y);
        self.state.groups.push(group);
        self.state.error = None;
        self.notify();
        Ok(id)
    }

    pub fn remove_group(&mut self, id: &str) -> bool {
        let before = self.state.groups.len();
        self.state.groups.retain(|g| g.id != id);
        if self.state.groups.len() == before {
            return false;
        }
        self.notify();
        true
    }

    /// Raw write of a patch. Callers validate first.
    pub fn update_group(&mut self, id: &str, patch: &GroupPatch) -> Result<(), SocketError> {
        if !self.state.enabled {
            return Err(SocketError::Disabled);
        }
        let Some(g) = self.state.groups.iter_mut().find(|g| g.id == id) else {
            return Err(SocketError::UnknownGroup(id.to_string()));
        };
        *g = g.patched(patch);
        self.notify();
        Ok(())
    }

    pub fn set_error(&mut self, message: Option<String>) {
        self.state.error = message;
        self.notify();
    }

    pub fn clear_for_plate(&mut self, plate_index: usize) {
        self.state.groups.retain(|g| g.plate_index != plate_index);
        self.notify();
    }

    /// Drop groups of the removed plate and move later groups down one index.
    pub fn shift_after_plate_removed(&mut self, removed_index: usize) {
        self.state.groups.retain(|g| g.plate_index != removed_index);
        for g in self.state.groups.iter_mut() {
            if g.plate_index > removed_index {
                g.plate_index -= 1;
            }
        }
        self.notify();
    }

    /// Drop groups pointing past the end of the plate list.
    pub fn ensure_groups_within(&mut self, plate_count: usize) {
        if plate_count == 0 {
            return;
        }
        let before = self.state.groups.len();
        self.state.groups.retain(|g| g.plate_index < plate_count);
        if self.state.groups.len() != before {
            self.notify();
        }
    }
}

// ----------------------------------------------------------------- units

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitState {
    pub unit: Unit,
}

#[derive(Default)]
pub struct UnitStore {
    state: UnitState,
    listeners: Listeners<UnitState>,
}

impl UnitStore {
    pub fn new(unit: Unit) -> Self {
        UnitStore {
            state: UnitState { unit },
            listeners: Listeners::default(),
        }
    }

    pub fn unit(&self) -> Unit {
        self.state.unit
    }

    pub fn snapshot(&self) -> &UnitState {
        &self.state
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&UnitState) + 'static) -> Subscription {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, sub: Subscription) -> bool {
        self.listeners.unsubscribe(sub)
    }

    pub fn set_unit(&mut self, unit: Unit) -> bool {
        if self.state.unit == unit {
            return false;
        }
        self.state.unit = unit;
        self.listeners.notify(&self.state);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter<T>() -> (Rc<Cell<usize>>, impl FnMut(&T) + 'static) {
        let n = Rc::new(Cell::new(0));
        let n2 = n.clone();
        (n, move |_: &T| n2.set(n2.get() + 1))
    }

    fn enabled_store(plates: &[Plate]) -> SocketStore {
        let mut s = SocketStore::new();
        s.set_enabled(true, plates).unwrap();
        s
    }

    #[test]
    fn plates_stay_clamped_and_non_empty() {
        let mut store = PlateStore::new();
        assert_eq!(store.plates().len(), 1);
        assert!(!store.remove_plate(0));
        store.update_plate(0, Dimension::Width, 1000.0);
        store.update_plate(0, Dimension::Height, 1.0);
        assert_eq!(store.plates()[0], Plate::new(300.0, 30.0));
        for _ in 0..20 {
            store.add_plate();
        }
        assert_eq!(store.plates().len(), MAX_PLATES);
        assert!(store.remove_plate(3));
        assert_eq!(store.plates().len(), MAX_PLATES - 1);
        assert!(!store.update_plate(42, Dimension::Width, 50.0));
    }

    #[test]
    fn listeners_run_synchronously_until_unsubscribed() {
        let mut store = PlateStore::new();
        let (n, listener) = counter();
        let sub = store.subscribe(listener);
        store.add_plate();
        assert_eq!(n.get(), 1);
        store.update_plate(1, Dimension::Width, 80.0);
        assert_eq!(n.get(), 2);
        assert!(store.unsubscribe(sub));
        store.add_plate();
        assert_eq!(n.get(), 2);
        assert!(!store.unsubscribe(sub));
    }

    #[test]
    fn sanitize_fills_empty_and_truncates() {
        let s = PlatesState { plates: vec![] }.sanitized();
        assert_eq!(s.plates, vec![Plate::default()]);
        let s = PlatesState {
            plates: vec![Plate { width: 1.0, height: 999.0 }; 15],
        }
        .sanitized();
        assert_eq!(s.plates.len(), MAX_PLATES);
        assert_eq!(s.plates[0], Plate::new(20.0, 128.0));
    }

    #[test]
    fn enabling_without_eligible_plate_sets_error() {
        let mut s = SocketStore::new();
        let err = s.set_enabled(true, &[Plate::new(30.0, 30.0)]).unwrap_err();
        assert_eq!(err, SocketError::NoEligiblePlate);
        assert!(!s.enabled());
        assert!(s.error().is_some());
    }

    #[test]
    fn add_group_places_without_overlap() {
        let plates = [Plate::new(120.0, 60.0)];
        let mut s = enabled_store(&plates);
        let a = s.add_group_on(0, &plates).unwrap();
        let b = s.add_group_on(0, &plates).unwrap();
        assert_ne!(a, b);
        let ga = s.group(&a).unwrap();
        let gb = s.group(&b).unwrap();
        assert_eq!((ga.x, ga.y), (6.5, 3.0));
        assert!(gb.x > ga.x);
        let all = s.groups().to_vec();
        for (i, g) in all.iter().enumerate() {
            assert_eq!(crate::placement::validate(&all, i, &plates[0], g), Ok(()));
        }
    }

    #[test]
    fn add_group_reports_full_plate() {
        let plates = [Plate::new(40.0, 40.0)];
        let mut s = enabled_store(&plates);
        let mut added = 0;
        let err = loop {
            match s.add_group_on(0, &plates) {
                Ok(_) => added += 1,
                Err(e) => break e,
            }
        };
        assert_eq!(added, 3);
        assert_eq!(err, SocketError::NoFreeSpace);
        assert_eq!(s.error(), Some("no space left for another socket group on this plate"));
    }

    #[test]
    fn disabled_store_refuses_edits() {
        let plates = [Plate::new(120.0, 60.0)];
        let mut s = enabled_store(&plates);
        let id = s.add_group_on(0, &plates).unwrap();
        s.set_enabled(false, &plates).unwrap();
        assert!(s.groups().is_empty());
        assert_eq!(s.add_group_on(0, &plates), Err(SocketError::Disabled));
        assert_eq!(
            s.update_group(&id, &GroupPatch::default()),
            Err(SocketError::Disabled)
        );
    }

    #[test]
    fn plate_removal_cascades_to_groups() {
        let plates = vec![Plate::new(100.0, 100.0); 3];
        let mut s = enabled_store(&plates);
        let g0 = s.add_group_on(0, &plates).unwrap();
        let g1 = s.add_group_on(1, &plates).unwrap();
        let g2 = s.add_group_on(2, &plates).unwrap();
        s.shift_after_plate_removed(1);
        assert_eq!(s.group(&g0).unwrap().plate_index, 0);
        assert!(s.group(&g1).is_none());
        assert_eq!(s.group(&g2).unwrap().plate_index, 1);
    }

    #[test]
    fn clear_and_ensure_drop_groups() {
        let plates = vec![Plate::new(100.0, 100.0); 2];
        let mut s = enabled_store(&plates);
        s.add_group_on(0, &plates).unwrap();
        let keep = s.add_group_on(1, &plates).unwrap();
        s.clear_for_plate(0);
        assert_eq!(s.groups().len(), 1);
        s.ensure_groups_within(1);
        assert!(s.group(&keep).is_none());
    }

    #[test]
    fn update_patches_in_place_and_unknown_id_errors() {
        let plates = [Plate::new(120.0, 60.0)];
        let mut s = enabled_store(&plates);
        let id = s.add_group_on(0, &plates).unwrap();
        s.update_group(&id, &GroupPatch { x: Some(20.0), ..Default::default() })
            .unwrap();
        assert_eq!(s.group(&id).unwrap().x, 20.0);
        assert!(matches!(
            s.update_group("nope", &GroupPatch::default()),
            Err(SocketError::UnknownGroup(_))
        ));
        assert!(s.remove_group(&id));
        assert!(!s.remove_group(&id));
    }

    #[test]
    fn unit_store_ignores_same_value() {
        let mut u = UnitStore::default();
        let (n, listener) = counter();
        u.subscribe(listener);
        assert!(!u.set_unit(Unit::Cm));
        assert!(u.set_unit(Unit::In));
        assert_eq!(n.get(), 1);
        assert_eq!(u.unit(), Unit::In);
    }

    #[derive(Clone, Debug)]
    enum PlateOp {
        Add,
        Remove(usize),
        Update(usize, Dimension, f64),
    }

    fn any_cm() -> impl Strategy<Value = f64> {
        prop_oneof![
            -1000.0f64..1000.0,
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
            any::<f64>(),
        ]
    }

    fn plate_op() -> impl Strategy<Value = PlateOp> {
        let dim = prop_oneof![Just(Dimension::Width), Just(Dimension::Height)];
        prop_oneof![
            Just(PlateOp::Add),
            (0usize..12).prop_map(PlateOp::Remove),
            (0usize..12, dim, any_cm()).prop_map(|(i, d, v)| PlateOp::Update(i, d, v)),
        ]
    }

    proptest! {
        #[test]
        fn plates_stay_in_range_after_every_mutation(ops in prop::collection::vec(plate_op(), 0..60)) {
            let mut store = PlateStore::new();
            for op in ops {
                match op {
                    PlateOp::Add => { store.add_plate(); }
                    PlateOp::Remove(i) => { store.remove_plate(i); }
                    PlateOp::Update(i, d, v) => { store.update_plate(i, d, v); }
                }
                let plates = store.plates();
                prop_assert!((1..=MAX_PLATES).contains(&plates.len()));
                for p in plates {
                    prop_assert!((20.0..=300.0).contains(&p.width), "width {}", p.width);
                    prop_assert!((30.0..=128.0).contains(&p.height), "height {}", p.height);
                }
            }
        }
    }
}
