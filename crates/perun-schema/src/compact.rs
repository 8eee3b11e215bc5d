//! Compact numeric codecs.
//!
//! Three lossy packings used by geometry streams and animation data:
//! half-precision floats, 10/10/10/2 packed normals, and the 6-byte
//! drop-largest-component quaternion. None of these raise errors - the wire
//! format has no representation for one, so edge cases (NaN, zero vectors,
//! round-off past the unit sphere) resolve to explicit fallback values.

use glam::{Quat, Vec3, Vec4};
use half::f16;

/// Canonical NaN bit pattern emitted for every NaN input.
///
/// Payload bits of the input NaN are not preserved.
pub const HALF_NAN: u16 = 0x7E00;

/// Magnitude of one quantization step of a packed-normal component.
const NORMAL_COMPONENT_MAX: f32 = 511.0;

/// Fixed-point scale of a stored quaternion component. The three kept
/// components lie in [-1/sqrt(2), 1/sqrt(2)], so this maps them onto the
/// signed 15-bit range.
const QUAT_COMPONENT_SCALE: f32 = 16383.0 * std::f32::consts::SQRT_2;

/// Pack an `f32` into IEEE binary16 bits.
#[inline]
pub fn pack_half(value: f32) -> u16 {
    if value.is_nan() {
        HALF_NAN
    } else {
        f16::from_f32(value).to_bits()
    }
}

/// Unpack IEEE binary16 bits into an `f32`.
#[inline]
pub fn unpack_half(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

/// Pack a direction vector and a 2-bit tag into 4 bytes.
///
/// `xyz` is quantized to signed 10-bit two's-complement fields, `w` (clamped
/// to 0..=3) fills the 2-bit tag. Axes 0 and 2 swap places on the wire to
/// match the engine's tangent-space convention; [`unpack_normal`] swaps them
/// back.
pub fn pack_normal(value: Vec4) -> u32 {
    #[inline]
    fn component(value: f32) -> u32 {
        let quantized = (value.clamp(-1.0, 1.0) * NORMAL_COMPONENT_MAX).round() as i32;
        // Re-bias negatives into the unsigned 10-bit range.
        let biased = if quantized < 0 {
            quantized + 1024
        } else {
            quantized
        };
        biased as u32 & 0x3FF
    }

    let tag = (value.w.round().clamp(0.0, 3.0)) as u32;
    component(value.z) | component(value.y) << 10 | component(value.x) << 20 | tag << 30
}

/// Unpack 4 bytes into a normalized direction vector plus the 2-bit tag in
/// `w`.
///
/// The all-zero vector decodes to `(0, 0, 0, 1)` instead of dividing by a
/// zero norm.
pub fn unpack_normal(bits: u32) -> Vec4 {
    #[inline]
    fn component(bits: u32) -> f32 {
        let raw = (bits & 0x3FF) as i32;
        // Sign-extend the 10-bit two's-complement field.
        let signed = if raw >= 512 { raw - 1024 } else { raw };
        signed as f32
    }

    let vector = Vec3::new(
        component(bits >> 20),
        component(bits >> 10),
        component(bits),
    );
    if vector == Vec3::ZERO {
        return Vec4::new(0.0, 0.0, 0.0, 1.0);
    }
    let tag = (bits >> 30) & 0x3;
    vector.normalize().extend(tag as f32)
}

/// Compress a unit quaternion into three 16-bit words (6 bytes).
///
/// The largest-magnitude component (ties broken toward the lowest index) is
/// dropped; the quaternion is sign-normalized so the dropped component is
/// non-negative, and the remaining three are stored as 15-bit fixed point.
/// The 2-bit drop index rides the top bits of the first two words.
pub fn pack_quat(q: Quat) -> [u16; 3] {
    let components = [q.x, q.y, q.z, q.w];

    let mut largest = 0;
    for i in 1..4 {
        if components[i].abs() > components[largest].abs() {
            largest = i;
        }
    }
    let flip = components[largest] < 0.0;

    let mut words = [0u16; 3];
    let mut slot = 0;
    for (i, &component) in components.iter().enumerate() {
        if i == largest {
            continue;
        }
        let value = if flip { -component } else { component };
        let fixed = (value * QUAT_COMPONENT_SCALE)
            .round()
            .clamp(-16383.0, 16383.0) as i32;
        // Two's complement within 15 bits.
        words[slot] = (fixed & 0x7FFF) as u16;
        slot += 1;
    }

    words[0] |= (((largest >> 1) & 1) as u16) << 15;
    words[1] |= ((largest & 1) as u16) << 15;
    words
}

/// Decompress three 16-bit words into a unit quaternion.
///
/// The dropped component is recomputed as `sqrt(max(0, 1 - x^2 - y^2 - z^2))`;
/// the clamp absorbs floating round-off past the unit sphere.
pub fn unpack_quat(words: [u16; 3]) -> Quat {
    #[inline]
    fn component(word: u16) -> f32 {
        let raw = (word & 0x7FFF) as i32;
        // Sign-extend the 15-bit two's-complement field.
        let signed = if raw >= 0x4000 { raw - 0x8000 } else { raw };
        signed as f32 / QUAT_COMPONENT_SCALE
    }

    let largest = (((words[0] >> 15) & 1) << 1 | ((words[1] >> 15) & 1)) as usize;
    let stored = [component(words[0]), component(words[1]), component(words[2])];

    let mut components = [0.0f32; 4];
    let mut slot = 0;
    for (i, component) in components.iter_mut().enumerate() {
        if i != largest {
            *component = stored[slot];
            slot += 1;
        }
    }
    let sum: f32 = stored.iter().map(|c| c * c).sum();
    components[largest] = (1.0 - sum).max(0.0).sqrt();

    Quat::from_array(components)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_quat_close(a: Quat, b: Quat, tolerance: f32) {
        assert!(
            (a.x - b.x).abs() < tolerance
                && (a.y - b.y).abs() < tolerance
                && (a.z - b.z).abs() < tolerance
                && (a.w - b.w).abs() < tolerance,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn test_half_roundtrip_exact_values() {
        for value in [0.0f32, -0.0, 1.0, -1.0, 0.5, 65504.0, f32::INFINITY] {
            assert_eq!(unpack_half(pack_half(value)), value);
        }
    }

    #[test]
    fn test_half_nan_is_canonical() {
        let noisy_nan = f32::from_bits(0x7FC0_1234);
        assert_eq!(pack_half(noisy_nan), HALF_NAN);
        assert!(unpack_half(HALF_NAN).is_nan());
    }

    #[test]
    fn test_normal_roundtrip() {
        let v = Vec3::new(0.3, -0.6, 0.7411).normalize();
        let out = unpack_normal(pack_normal(v.extend(1.0)));
        assert!((out.truncate() - v).length() < 3e-3);
        assert_eq!(out.w, 1.0);
    }

    #[test]
    fn test_normal_axis_swap_on_wire() {
        // +X input must land in the low (axis 2) field.
        let bits = pack_normal(Vec4::new(1.0, 0.0, 0.0, 0.0));
        assert_eq!(bits & 0x3FF, 0);
        assert_eq!((bits >> 20) & 0x3FF, 511);
    }

    #[test]
    fn test_normal_negative_components() {
        let v = Vec3::new(-1.0, 0.0, 0.0);
        let out = unpack_normal(pack_normal(v.extend(0.0)));
        assert!((out.truncate() - v).length() < 3e-3);
    }

    #[test]
    fn test_normal_zero_vector_default() {
        assert_eq!(
            unpack_normal(pack_normal(Vec4::ZERO)),
            Vec4::new(0.0, 0.0, 0.0, 1.0)
        );
    }

    #[test]
    fn test_quat_reference_roundtrip() {
        let q = Quat::from_xyzw(0.0, 0.0, -0.10186, 0.9947987);
        let out = unpack_quat(pack_quat(q));
        assert_quat_close(out, q, 1e-4);
    }

    #[test]
    fn test_quat_drop_slot_and_sign() {
        // y is distinctly largest; it must come back in slot 1 with its sign.
        let q = Quat::from_xyzw(0.1, 0.97, -0.15, 0.12).normalize();
        let out = unpack_quat(pack_quat(q));
        assert_quat_close(out, q, 1e-3);
    }

    #[test]
    fn test_quat_negative_largest_flips_sign() {
        // w < 0: the codec stores -q, which is the same rotation.
        let q = Quat::from_xyzw(0.1, 0.2, 0.3, -0.9).normalize();
        let out = unpack_quat(pack_quat(q));
        assert_quat_close(out, Quat::from_array([-q.x, -q.y, -q.z, -q.w]), 1e-3);
    }

    #[test]
    fn test_quat_tie_break_lowest_index() {
        let half = 0.5f32;
        let q = Quat::from_xyzw(half, half, half, half);
        let words = pack_quat(q);
        // All magnitudes equal: index 0 must be dropped.
        let largest = ((words[0] >> 15) & 1) << 1 | ((words[1] >> 15) & 1);
        assert_eq!(largest, 0);
        assert_quat_close(unpack_quat(words), q, 1e-3);
    }

    #[test]
    fn test_quat_identity() {
        assert_quat_close(unpack_quat(pack_quat(Quat::IDENTITY)), Quat::IDENTITY, 1e-4);
    }
}
