use crate::config::ReorderConfig;
use crate::geometry::Rect;

/// Vertical extent the dragged item would occupy if it were still laid out in the list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DraggedSpan {
    pub top: f64,
    pub bottom: f64,
}

impl DraggedSpan {
    /// `pointer_y - offset_y` is where the item's top edge follows the pointer.
    pub fn new(pointer_y: f64, offset_y: f64, height: f64) -> Self {
        let top = pointer_y - offset_y;
        Self {
            top,
            bottom: top + height,
        }
    }
}

/// Picks the slot the decoy should move to for one pointer evaluation, or `None` to stay.
///
/// `slots` are the list children in order, decoy included at `decoy_index`. A child only
/// becomes a candidate once the dragged bottom edge passes `top_threshold` of its height and
/// while the dragged top edge is still above `bottom_threshold`; the gap between the two bands
/// keeps the decoy from flickering back and forth on a boundary. The result is never more than
/// `max_step` slots away from `decoy_index`.
pub fn find_swap_target(
    slots: impl IntoIterator<Item = Rect>,
    dragged: DraggedSpan,
    decoy_index: usize,
    config: &ReorderConfig,
) -> Option<usize> {
    let mut swap_with_last = true;
    let mut target = None;
    let mut count = 0;

    for (i, slot) in slots.into_iter().enumerate() {
        count = i + 1;
        let top_threshold = slot.top() + slot.height * config.top_threshold;
        let bottom_threshold = slot.top() + slot.height * config.bottom_threshold;

        if dragged.bottom > top_threshold {
            if dragged.top < bottom_threshold && i != decoy_index {
                target = Some(i);
                swap_with_last = false;
                break;
            }
            continue;
        }

        // the dragged item ends above this child, so the boundary is the slot before it
        swap_with_last = false;
        if i == decoy_index || i.checked_sub(1) == Some(decoy_index) {
            break;
        }
        target = Some(if i < decoy_index { i } else { i - 1 });
        break;
    }

    if swap_with_last && count > 0 && decoy_index != count - 1 {
        target = Some(count - 1);
    }

    let target = target?;
    let max_step = config.max_step.max(1);
    let target = if target > decoy_index {
        target.min(decoy_index + max_step)
    } else {
        target.max(decoy_index.saturating_sub(max_step))
    };
    (target != decoy_index).then_some(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stacked rows of 40px starting at y=0.
    fn rows(count: usize) -> Vec<Rect> {
        (0..count)
            .map(|i| Rect::new(0.0, i as f64 * 40.0, 200.0, 40.0))
            .collect()
    }

    fn target(count: usize, top: f64, decoy_index: usize) -> Option<usize> {
        find_swap_target(
            rows(count),
            DraggedSpan::new(top, 0.0, 40.0),
            decoy_index,
            &ReorderConfig::default(),
        )
    }

    #[test]
    fn resting_in_place_is_not_a_swap() {
        assert_eq!(target(3, 40.0, 1), None);
        // small wiggles inside the hysteresis band
        assert_eq!(target(3, 50.0, 1), None);
        assert_eq!(target(3, 30.0, 1), None);
    }

    #[test]
    fn crossing_the_next_sibling_threshold_moves_down() {
        // bottom edge 105 passes 80 + 0.6 * 40 = 104 while top 65 is above 96
        assert_eq!(target(3, 65.0, 1), Some(2));
        assert_eq!(target(3, 63.0, 1), None);
    }

    #[test]
    fn crossing_the_previous_sibling_threshold_moves_up() {
        // top edge 15 is above 0 + 0.4 * 40 = 16
        assert_eq!(target(3, 15.0, 1), Some(0));
        assert_eq!(target(3, 17.0, 1), None);
    }

    #[test]
    fn past_the_end_appends() {
        assert_eq!(target(3, 500.0, 1), Some(2));
        assert_eq!(target(3, 500.0, 2), None);
    }

    #[test]
    fn far_jumps_are_limited_to_one_slot() {
        // pointer far above the first item while the decoy sits at the bottom
        assert_eq!(target(6, -300.0, 5), Some(4));
        assert_eq!(target(6, 1000.0, 0), Some(1));
    }

    #[test]
    fn max_step_widens_the_limit() {
        let config = ReorderConfig {
            max_step: 3,
            ..ReorderConfig::default()
        };
        let span = DraggedSpan::new(1000.0, 0.0, 40.0);
        assert_eq!(find_swap_target(rows(6), span, 0, &config), Some(3));
    }

    #[test]
    fn single_item_and_empty_lists_never_swap() {
        assert_eq!(target(1, 300.0, 0), None);
        assert_eq!(target(1, -300.0, 0), None);
        assert_eq!(
            find_swap_target(
                Vec::new(),
                DraggedSpan::new(0.0, 0.0, 40.0),
                0,
                &ReorderConfig::default()
            ),
            None
        );
    }

    #[test]
    fn span_follows_pointer_offset() {
        let span = DraggedSpan::new(130.0, 20.0, 40.0);
        assert_eq!(span.top, 110.0);
        assert_eq!(span.bottom, 150.0);
    }
}
