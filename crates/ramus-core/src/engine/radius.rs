//! Difficulty-adaptive SPR radius heuristics. Pure functions, no side effects.

/// Upper bound on the SPR radius explored for a dataset of the given
/// difficulty, a triangular function peaking at difficulty 0.5:
/// easy (0) and pathologically difficult (1) datasets both get shallow
/// radii, intermediate ones get deep rearrangements.
pub fn spr_radius_limit_adaptive(difficulty: f64) -> usize {
    if difficulty <= 0.5 {
        (30.0 * difficulty + 5.0) as usize
    } else {
        (-30.0 * difficulty + 35.0) as usize
    }
}

/// Step by which the SPR radius window slides, bucketed so deeper limits are
/// covered in proportionally fewer, wider strides; thorough rounds take
/// wider strides than fast ones.
pub fn spr_radius_step_adaptive(radius_limit: usize, thorough: bool) -> usize {
    if thorough {
        if radius_limit <= 7 {
            radius_limit
        } else if radius_limit <= 13 {
            radius_limit / 2 + 1
        } else {
            radius_limit / 3 + 1
        }
    } else if radius_limit <= 5 {
        radius_limit
    } else if radius_limit <= 10 {
        radius_limit / 2 + 1
    } else if radius_limit <= 15 {
        radius_limit / 3 + 1
    } else {
        radius_limit / 4 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_peaks_at_intermediate_difficulty() {
        assert_eq!(spr_radius_limit_adaptive(0.5), 20);
        assert_eq!(spr_radius_limit_adaptive(0.0), 5);
        assert_eq!(spr_radius_limit_adaptive(1.0), 5);
    }

    #[test]
    fn limit_is_symmetric_about_half() {
        // Exactly representable difficulties, so both branches see the same
        // real-valued operand before truncation.
        for k in 0..=4 {
            let d = k as f64 * 0.125;
            assert_eq!(
                spr_radius_limit_adaptive(d),
                spr_radius_limit_adaptive(1.0 - d),
                "asymmetric at difficulty {d}"
            );
        }
    }

    #[test]
    fn fast_step_buckets() {
        assert_eq!(spr_radius_step_adaptive(5, false), 5);
        assert_eq!(spr_radius_step_adaptive(10, false), 6);
        assert_eq!(spr_radius_step_adaptive(15, false), 6);
        assert_eq!(spr_radius_step_adaptive(20, false), 6);
    }

    #[test]
    fn thorough_step_buckets() {
        assert_eq!(spr_radius_step_adaptive(7, true), 7);
        assert_eq!(spr_radius_step_adaptive(13, true), 7);
        assert_eq!(spr_radius_step_adaptive(14, true), 5);
        assert_eq!(spr_radius_step_adaptive(20, true), 7);
    }
}
