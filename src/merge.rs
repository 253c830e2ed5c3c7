//! Render-target merger (C6, §4.6).
//!
//! Decides whether two draw passes' render targets may be fused into one
//! backend render pass, and folds one descriptor into another once they are
//! known to be compatible.

use crate::pass::{Attachment, ClearOp, PassRecord, RenderTargetDescriptor};

fn slot_compatible(a: Option<&Attachment>, b: Option<&Attachment>) -> bool {
    match (a, b) {
        (None, _) | (_, None) => true,
        (Some(a), Some(b)) => {
            a.texture == b.texture
                && a.mip_level == b.mip_level
                && a.slice == b.slice
                && a.depth_plane == b.depth_plane
                && a.resolve == b.resolve
                && !matches!(b.clear, ClearOp::Clear(_))
        }
    }
}

fn any_slot_shared(a: &RenderTargetDescriptor, b: &RenderTargetDescriptor) -> bool {
    let color_shared = a
        .color_attachments
        .iter()
        .zip(b.color_attachments.iter())
        .any(|(a, b)| matches!((a, b), (Some(a), Some(b)) if a.texture == b.texture));
    let depth_shared = matches!((&a.depth, &b.depth), (Some(a), Some(b)) if a.texture == b.texture);
    let stencil_shared =
        matches!((&a.stencil, &b.stencil), (Some(a), Some(b)) if a.texture == b.texture);
    color_shared || depth_shared || stencil_shared
}

/// `size_of` per §4.6: the minimum `(width >> level, height >> level)` over
/// every bound attachment.
fn render_target_size(desc: &RenderTargetDescriptor) -> Option<(u32, u32)> {
    desc.color_attachments
        .iter()
        .flatten()
        .chain(desc.depth.iter())
        .chain(desc.stencil.iter())
        .map(|a| a.extent)
        .min()
}

/// True iff `a` and `b`'s render targets may share one backend render pass.
#[must_use]
pub fn mergeable(a: &PassRecord, b: &PassRecord) -> bool {
    let (Some(rt_a), Some(rt_b)) = (&a.render_target, &b.render_target) else {
        return false;
    };

    for slot in 0..8 {
        if !slot_compatible(rt_a.color_attachments[slot].as_ref(), rt_b.color_attachments[slot].as_ref()) {
            return false;
        }
    }
    if !slot_compatible(rt_a.depth.as_ref(), rt_b.depth.as_ref()) {
        return false;
    }
    if !slot_compatible(rt_a.stencil.as_ref(), rt_b.stencil.as_ref()) {
        return false;
    }

    match (rt_a.visibility_buffer, rt_b.visibility_buffer) {
        (Some(x), Some(y)) if x != y => return false,
        _ => {}
    }

    if !any_slot_shared(rt_a, rt_b) {
        return false;
    }

    render_target_size(rt_a).is_some() && render_target_size(rt_a) == render_target_size(rt_b)
}

/// Folds `other`'s render target into `accumulator`'s, assuming
/// [`mergeable`] already holds between them. Empty slots in `accumulator`
/// are filled from `other`; `array_length` becomes the max of the two.
///
/// # Panics
///
/// Panics if `accumulator` and `other` are not both draw passes with render
/// targets, or are not mergeable — callers must check [`mergeable`] first.
pub fn try_merge(accumulator: &mut PassRecord, other: &PassRecord) {
    assert!(mergeable(accumulator, other), "try_merge called on non-mergeable passes");

    let other_rt = other.render_target.clone().expect("checked by mergeable");
    let acc_rt = accumulator.render_target.as_mut().expect("checked by mergeable");

    for slot in 0..8 {
        if acc_rt.color_attachments[slot].is_none() {
            acc_rt.color_attachments[slot] = other_rt.color_attachments[slot].clone();
        }
    }
    if acc_rt.depth.is_none() {
        acc_rt.depth = other_rt.depth.clone();
    }
    if acc_rt.stencil.is_none() {
        acc_rt.stencil = other_rt.stencil.clone();
    }
    if acc_rt.visibility_buffer.is_none() {
        acc_rt.visibility_buffer = other_rt.visibility_buffer;
    }
    acc_rt.array_length = acc_rt.array_length.max(other_rt.array_length);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::PassKind;
    use crate::resource::{Lifetime, PixelFormat, ResourceHandle, ResourceKind};

    fn texture(index: u32) -> ResourceHandle {
        ResourceHandle::new(ResourceKind::Texture, Lifetime::Transient, 0, 0, index)
    }

    fn attachment(texture_handle: ResourceHandle, extent: (u32, u32), clear: ClearOp) -> Attachment {
        Attachment {
            texture: texture_handle,
            mip_level: 0,
            slice: 0,
            depth_plane: 0,
            resolve: None,
            extent,
            clear,
            format: PixelFormat::Rgba8Unorm,
        }
    }

    fn draw_pass(index: u32, color: Attachment, depth: Option<Attachment>) -> PassRecord {
        let mut pass = PassRecord::new(index, PassKind::Draw, format!("p{index}"));
        let mut rt = RenderTargetDescriptor::new();
        rt.set_color(0, color);
        rt.depth = depth;
        pass.render_target = Some(rt);
        pass
    }

    #[test]
    fn scenario_s3_sequential_keep_clear_merges_then_rejects_third() {
        let tex = texture(0);
        let depth_tex = texture(1);

        let p0 = draw_pass(
            0,
            attachment(tex, (512, 512), ClearOp::Clear(crate::pass::ClearValue::Color([0.0, 0.0, 0.0, 1.0]))),
            Some(attachment(depth_tex, (512, 512), ClearOp::Clear(crate::pass::ClearValue::DepthStencil { depth: 1.0, stencil: 0 }))),
        );
        let p1 = draw_pass(
            1,
            attachment(tex, (512, 512), ClearOp::Keep),
            Some(attachment(depth_tex, (512, 512), ClearOp::Keep)),
        );
        let p2 = draw_pass(
            2,
            attachment(tex, (512, 512), ClearOp::Clear(crate::pass::ClearValue::Color([1.0, 1.0, 1.0, 1.0]))),
            None,
        );

        assert!(mergeable(&p0, &p1));
        let mut merged = p0;
        try_merge(&mut merged, &p1);
        assert!(!mergeable(&merged, &p2));
    }

    #[test]
    fn scenario_s4_mismatched_mip_size_is_not_mergeable() {
        let tex = texture(0);
        let p0 = draw_pass(0, attachment(tex, (512, 512), ClearOp::Keep), None);
        let mut p1_attachment = attachment(tex, (256, 256), ClearOp::Keep);
        p1_attachment.mip_level = 1;
        let p1 = draw_pass(1, p1_attachment, None);
        assert!(!mergeable(&p0, &p1));
    }

    #[test]
    fn disjoint_render_targets_are_not_mergeable() {
        let p0 = draw_pass(0, attachment(texture(0), (512, 512), ClearOp::Keep), None);
        let p1 = draw_pass(1, attachment(texture(1), (512, 512), ClearOp::Keep), None);
        assert!(!mergeable(&p0, &p1));
    }
}
