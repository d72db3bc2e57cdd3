//! Ranked-choice reordering.
//!
//! A ranked answer is an ordered list of selected option values; rank is
//! position. Options not in the list are available but unranked and are
//! shown after the ranked ones.
//!
//! Reordering happens by dragging. [`Placement::from_pointer`] turns a
//! pointer position over a row into "insert before" or "insert after", and
//! [`move_item`] applies the drop. [`DragGesture`] tells an intentional
//! reorder apart from an incidental scroll, for pointers that have no
//! native drag and drop (touch screens, terminals).

use std::time::{Duration, Instant};

use crate::SelectOption;

/// How long a press must be held before it becomes a drag.
pub const HOLD_DELAY: Duration = Duration::from_millis(350);

/// How far a pointer may move during the hold before it counts as a scroll.
pub const MOVE_TOLERANCE: f32 = 10.0;

/// Select `value` (appending it) or deselect it (keeping the rest in order).
///
/// Returns whether `value` is selected afterwards.
pub fn toggle(order: &mut Vec<String>, value: &str) -> bool {
    if let Some(index) = order.iter().position(|v| v == value) {
        order.remove(index);
        false
    } else {
        order.push(value.to_string());
        true
    }
}

/// The unranked options, in option order.
pub fn unranked<'a>(options: &'a [SelectOption], order: &[String]) -> Vec<&'a SelectOption> {
    options
        .iter()
        .filter(|opt| !order.contains(&opt.value))
        .collect()
}

/// Which side of the row under the pointer a drop lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

impl Placement {
    /// Compare the pointer against the row's vertical midpoint.
    pub fn from_pointer(y: f32, top: f32, height: f32) -> Self {
        if y < top + height / 2.0 {
            Self::Before
        } else {
            Self::After
        }
    }
}

/// Where a dragged item is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// On the row of a ranked item.
    Item { value: String, placement: Placement },
    /// Past the last ranked row (including the unranked region).
    End,
}

/// Move `dragged` to `target`.
///
/// The dragged value is removed first; the target index is computed in the
/// list without it. Dropping onto itself, dragging a value that is not
/// ranked, or targeting a value that is not ranked leaves `order` as is,
/// except that [`DropTarget::End`] moves to the last ranked position.
/// Returns whether the order changed.
pub fn move_item(order: &mut Vec<String>, dragged: &str, target: &DropTarget) -> bool {
    let Some(from) = order.iter().position(|v| v == dragged) else {
        return false;
    };
    if let DropTarget::Item { value, .. } = target
        && (value == dragged || !order.contains(value))
    {
        return false;
    }

    let before = order.clone();
    let item = order.remove(from);
    let to = match target {
        DropTarget::End => order.len(),
        DropTarget::Item { value, placement } => {
            let index = order.iter().position(|v| v == value).unwrap_or(order.len());
            match placement {
                Placement::Before => index,
                Placement::After => index + 1,
            }
        }
    };
    order.insert(to.min(order.len()), item);
    *order != before
}

/// A pointer position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// What the gesture currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    /// Pressed, waiting for the hold to elapse.
    Pending,
    Dragging,
    /// Moved too early; the press was a scroll and is ignored until release.
    Scrolling,
}

/// A finished drag: which item was dragged and where it was released.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragDrop {
    pub item: usize,
    pub at: Point,
}

/// Press-and-hold drag recognition.
///
/// A press on a drag handle arms the drag immediately. A press anywhere else
/// arms it only after [`HOLD_DELAY`] without moving more than the tolerance;
/// moving further before that classifies the press as a scroll.
#[derive(Debug, Clone)]
pub struct DragGesture {
    phase: GesturePhase,
    item: usize,
    origin: Point,
    pressed_at: Option<Instant>,
    tolerance: f32,
    hold: Duration,
}

impl Default for DragGesture {
    fn default() -> Self {
        Self::new()
    }
}

impl DragGesture {
    pub fn new() -> Self {
        Self {
            phase: GesturePhase::Idle,
            item: 0,
            origin: Point::default(),
            pressed_at: None,
            tolerance: MOVE_TOLERANCE,
            hold: HOLD_DELAY,
        }
    }

    /// Use a different movement tolerance, e.g. one terminal cell.
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    pub fn is_dragging(&self) -> bool {
        self.phase == GesturePhase::Dragging
    }

    /// The item being dragged, if a drag is armed.
    pub fn dragged(&self) -> Option<usize> {
        self.is_dragging().then_some(self.item)
    }

    pub fn press(&mut self, item: usize, at: Point, on_handle: bool, now: Instant) -> GesturePhase {
        self.item = item;
        self.origin = at;
        self.pressed_at = Some(now);
        self.phase = if on_handle {
            GesturePhase::Dragging
        } else {
            GesturePhase::Pending
        };
        self.phase
    }

    /// Arm a pending press once the hold has elapsed.
    pub fn tick(&mut self, now: Instant) -> GesturePhase {
        if self.phase == GesturePhase::Pending && self.held_long_enough(now) {
            self.phase = GesturePhase::Dragging;
        }
        self.phase
    }

    pub fn move_to(&mut self, at: Point, now: Instant) -> GesturePhase {
        if self.phase == GesturePhase::Pending {
            if self.held_long_enough(now) {
                self.phase = GesturePhase::Dragging;
            } else if at.distance(self.origin) > self.tolerance {
                self.phase = GesturePhase::Scrolling;
            }
        }
        self.phase
    }

    /// Finish the gesture. Returns the drop if a drag was armed.
    pub fn release(&mut self, at: Point, now: Instant) -> Option<DragDrop> {
        self.tick(now);
        let drop = self.is_dragging().then_some(DragDrop {
            item: self.item,
            at,
        });
        self.cancel();
        drop
    }

    pub fn cancel(&mut self) {
        self.phase = GesturePhase::Idle;
        self.pressed_at = None;
    }

    fn held_long_enough(&self, now: Instant) -> bool {
        self.pressed_at
            .is_some_and(|t| now.saturating_duration_since(t) >= self.hold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn toggle_appends_and_removes() {
        let mut o = order(&["a", "b", "c"]);
        assert!(!toggle(&mut o, "b"));
        assert_eq!(o, order(&["a", "c"]));
        assert!(toggle(&mut o, "b"));
        assert_eq!(o, order(&["a", "c", "b"]));
    }

    #[test]
    fn drag_last_before_first() {
        let mut o = order(&["a", "b", "c"]);
        let target = DropTarget::Item {
            value: "a".into(),
            placement: Placement::Before,
        };
        assert!(move_item(&mut o, "c", &target));
        assert_eq!(o, order(&["c", "a", "b"]));

        let onto_self = DropTarget::Item {
            value: "a".into(),
            placement: Placement::After,
        };
        assert!(!move_item(&mut o, "a", &onto_self));
        assert_eq!(o, order(&["c", "a", "b"]));
    }

    #[test]
    fn drag_first_after_last() {
        let mut o = order(&["a", "b", "c"]);
        let target = DropTarget::Item {
            value: "c".into(),
            placement: Placement::After,
        };
        move_item(&mut o, "a", &target);
        assert_eq!(o, order(&["b", "c", "a"]));
    }

    #[test]
    fn drop_past_the_end_clamps() {
        let mut o = order(&["a", "b", "c"]);
        move_item(&mut o, "a", &DropTarget::End);
        assert_eq!(o, order(&["b", "c", "a"]));
        assert!(!move_item(&mut o, "a", &DropTarget::End));
    }

    #[test]
    fn unranked_values_cannot_be_dragged() {
        let mut o = order(&["a", "b"]);
        let target = DropTarget::Item {
            value: "a".into(),
            placement: Placement::Before,
        };
        assert!(!move_item(&mut o, "z", &target));
        assert_eq!(o, order(&["a", "b"]));
    }

    #[test]
    fn midpoint_rule() {
        assert_eq!(Placement::from_pointer(10.0, 10.0, 20.0), Placement::Before);
        assert_eq!(Placement::from_pointer(19.9, 10.0, 20.0), Placement::Before);
        assert_eq!(Placement::from_pointer(20.0, 10.0, 20.0), Placement::After);
    }

    #[test]
    fn handle_press_drags_immediately() {
        let now = Instant::now();
        let mut gesture = DragGesture::new();
        assert_eq!(
            gesture.press(2, Point::new(0.0, 0.0), true, now),
            GesturePhase::Dragging
        );
        let drop = gesture.release(Point::new(0.0, 40.0), now).unwrap();
        assert_eq!(drop.item, 2);
        assert_eq!(gesture.phase(), GesturePhase::Idle);
    }

    #[test]
    fn hold_arms_drag() {
        let now = Instant::now();
        let mut gesture = DragGesture::new();
        gesture.press(1, Point::new(5.0, 5.0), false, now);
        assert_eq!(gesture.tick(now + Duration::from_millis(100)), GesturePhase::Pending);
        assert_eq!(gesture.tick(now + HOLD_DELAY), GesturePhase::Dragging);
        assert_eq!(
            gesture.move_to(Point::new(5.0, 80.0), now + HOLD_DELAY),
            GesturePhase::Dragging
        );
    }

    #[test]
    fn early_movement_is_a_scroll() {
        let now = Instant::now();
        let mut gesture = DragGesture::new();
        gesture.press(0, Point::new(0.0, 0.0), false, now);
        assert_eq!(
            gesture.move_to(Point::new(0.0, 30.0), now + Duration::from_millis(50)),
            GesturePhase::Scrolling
        );
        assert!(gesture.release(Point::new(0.0, 60.0), now + HOLD_DELAY).is_none());
    }

    #[test]
    fn small_jitter_keeps_pending() {
        let now = Instant::now();
        let mut gesture = DragGesture::new();
        gesture.press(0, Point::new(0.0, 0.0), false, now);
        assert_eq!(
            gesture.move_to(Point::new(3.0, 4.0), now + Duration::from_millis(50)),
            GesturePhase::Pending
        );
    }
}
