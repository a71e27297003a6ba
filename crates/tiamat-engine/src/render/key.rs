//! Draw-item sort keys.
//!
//! A draw is ordered by a single packed `u64` so the whole frame can be
//! sorted in one pass:
//!
//! ```text
//! bits 63..48   render-queue bucket (ascending)
//! bits 47..16   view depth (front-to-back for opaque buckets,
//!               back-to-front for blended buckets)
//! bits 15..0    material slot, to batch pipeline/bind-group changes
//!               among draws at equal depth
//! ```
//!
//! Ties beyond the key keep submission order (the frame sort is stable).

use crate::material::RenderQueue;

/// Packs a draw key from bucket, view-space depth and material slot.
///
/// `view_depth` is distance in front of the camera (negative values clamp to
/// zero). The IEEE bit pattern of a non-negative float is monotonic, so the
/// raw bits sort correctly without quantization; blended buckets invert the
/// bits to flip the direction.
pub(crate) fn draw_key(queue: RenderQueue, view_depth: f32, material_slot: u16) -> u64 {
    let depth_bits = view_depth.max(0.0).to_bits();
    let depth_bits = if queue.is_blended() {
        !depth_bits
    } else {
        depth_bits
    };

    ((queue.0 as u64) << 48) | ((depth_bits as u64) << 16) | material_slot as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── bucket ordering ───────────────────────────────────────────────────

    #[test]
    fn bucket_dominates_depth() {
        // A far opaque draw still precedes a near transparent one.
        let opaque_far = draw_key(RenderQueue::OPAQUE, 1000.0, 0);
        let blended_near = draw_key(RenderQueue::TRANSPARENT, 0.1, 0);
        assert!(opaque_far < blended_near);

        let background = draw_key(RenderQueue::BACKGROUND, 0.0, 0);
        assert!(background < opaque_far);
    }

    // ── depth direction ───────────────────────────────────────────────────

    #[test]
    fn opaque_sorts_front_to_back() {
        let near = draw_key(RenderQueue::OPAQUE, 1.0, 0);
        let far = draw_key(RenderQueue::OPAQUE, 50.0, 0);
        assert!(near < far);
    }

    #[test]
    fn transparent_sorts_back_to_front() {
        let near = draw_key(RenderQueue::TRANSPARENT, 1.0, 0);
        let far = draw_key(RenderQueue::TRANSPARENT, 50.0, 0);
        assert!(far < near);
    }

    #[test]
    fn negative_depth_clamps_to_zero() {
        let behind = draw_key(RenderQueue::OPAQUE, -5.0, 0);
        let at_camera = draw_key(RenderQueue::OPAQUE, 0.0, 0);
        assert_eq!(behind, at_camera);
    }

    // ── material batching ─────────────────────────────────────────────────

    #[test]
    fn equal_depth_groups_by_material() {
        let a0 = draw_key(RenderQueue::OPAQUE, 10.0, 0);
        let a1 = draw_key(RenderQueue::OPAQUE, 10.0, 1);
        let b0 = draw_key(RenderQueue::OPAQUE, 10.0, 0);
        assert!(a0 < a1);
        assert_eq!(a0, b0);
    }

    #[test]
    fn depth_dominates_material() {
        let near_high_mat = draw_key(RenderQueue::OPAQUE, 1.0, u16::MAX);
        let far_low_mat = draw_key(RenderQueue::OPAQUE, 2.0, 0);
        assert!(near_high_mat < far_low_mat);
    }
}
