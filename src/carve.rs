use log::debug;
use ndarray::{ArrayViewMut, IxDyn};

use crate::{LayoutError, LayoutPlan, NamedViews, Result};

/// Carves a flat buffer into the plan's named views.
///
/// Walks the segments in plan order, peeling each segment's elements off
/// the front of the buffer and reshaping them row-major into the
/// segment's shape. The views alias the buffer; nothing is copied and
/// nothing is written.
///
/// A buffer longer than the plan is accepted and its prefix carved, so a
/// caller can hand out windows of a whole-network vector.
///
/// # Arguments
/// * `buffer` - The flat parameter or gradient buffer to alias.
/// * `plan` - The layout plan to carve by.
///
/// # Errors
/// Returns `BufferTooSmall` if the buffer holds fewer elements than the
/// plan's total length.
pub fn carve<'a>(mut buffer: &'a mut [f32], plan: &LayoutPlan) -> Result<NamedViews<'a>> {
    if buffer.len() < plan.total_len() {
        return Err(LayoutError::BufferTooSmall {
            family: plan.family(),
            got: buffer.len(),
            expected: plan.total_len(),
        });
    }

    let mut entries = Vec::with_capacity(plan.segments().len());

    for segment in plan.segments() {
        let (chunk, rest) = buffer.split_at_mut(segment.len());
        buffer = rest;

        // `Segment::len` is the product of the shape, so the reshape
        // cannot fail.
        let view = ArrayViewMut::from_shape(IxDyn(segment.shape()), chunk).unwrap();
        entries.push((segment.name(), view));
    }

    debug!(
        "carved {} views ({} elements) for {}",
        entries.len(),
        plan.total_len(),
        plan.family(),
    );

    Ok(NamedViews::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParamRole, Segment};

    fn plan() -> LayoutPlan {
        let segments = vec![
            Segment::new("b", ParamRole::Bias, vec![2]),
            Segment::new("W", ParamRole::Weight, vec![2, 2, 1, 1]),
        ];

        LayoutPlan::new("convolution2d", segments, 6).unwrap()
    }

    #[test]
    fn views_alias_consecutive_intervals() {
        let mut buffer = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let views = carve(&mut buffer, &plan()).unwrap();

        assert_eq!(views.keys().collect::<Vec<_>>(), ["b", "W"]);

        let b = views.get("b").unwrap();
        assert_eq!(b.shape(), &[2]);
        assert_eq!(b.iter().copied().collect::<Vec<_>>(), [1.0, 2.0]);

        let w = views.get("W").unwrap();
        assert_eq!(w.shape(), &[2, 2, 1, 1]);
        assert_eq!(w.iter().copied().collect::<Vec<_>>(), [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn writes_through_views_land_in_the_buffer() {
        let mut buffer = [0.0f32; 6];

        {
            let mut views = carve(&mut buffer, &plan()).unwrap();
            views.get_mut("b").unwrap().fill(-1.0);
            views.get_mut("W").unwrap().fill(2.0);
        }

        assert_eq!(buffer, [-1.0, -1.0, 2.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn longer_buffers_carve_their_prefix() {
        let mut buffer = [7.0f32; 10];
        let views = carve(&mut buffer, &plan()).unwrap();

        assert_eq!(views.len(), 2);
    }

    #[test]
    fn short_buffers_are_refused() {
        let mut buffer = [0.0f32; 5];

        let err = carve(&mut buffer, &plan()).unwrap_err();
        assert_eq!(
            err,
            LayoutError::BufferTooSmall {
                family: "convolution2d",
                got: 5,
                expected: 6,
            }
        );
    }
}
