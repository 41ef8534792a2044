use super::Mask;
use ndarray::{s, Array2, Zip};

/// A 3x3 neighbourhood is "in" when its alpha sum exceeds half of 9 * 255,
/// i.e. at least five fully-set samples.
const MAJORITY_SUM: u32 = 9 * 255 / 2;

/// Majority-vote denoise of a raw flood-fill mask.
///
/// Each interior pixel becomes 255 when most of its 3x3 neighbourhood is set,
/// otherwise 0. The outer 1-pixel border is always 0. Output is strictly binary.
pub fn smooth(raw: &Mask) -> Mask {
    let _span = tracing::debug_span!("smooth").entered();

    let mut smoothed = Array2::<u8>::zeros(raw.alpha.raw_dim());
    if raw.width() < 3 || raw.height() < 3 {
        return Mask::from(smoothed);
    }

    Zip::from(smoothed.slice_mut(s![1..-1, 1..-1]))
        .and(raw.alpha.windows((3, 3)))
        .for_each(|out, window| {
            let sum: u32 = window.iter().map(|&a| a as u32).sum();
            if sum > MAJORITY_SUM {
                *out = 255;
            }
        });

    Mask::from(smoothed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(width: u32, height: u32) -> Mask {
        Mask::from_raw(width, height, vec![255; (width * height) as usize]).unwrap()
    }

    #[test]
    fn test_border_is_always_cleared() {
        let smoothed = smooth(&filled(6, 5));
        let (w, h) = smoothed.dimensions();

        for x in 0..w {
            assert_eq!(smoothed.get(x, 0), 0);
            assert_eq!(smoothed.get(x, h - 1), 0);
        }
        for y in 0..h {
            assert_eq!(smoothed.get(0, y), 0);
            assert_eq!(smoothed.get(w - 1, y), 0);
        }
        // Interior of a full mask stays full
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                assert_eq!(smoothed.get(x, y), 255);
            }
        }
    }

    #[test]
    fn test_removes_isolated_pixel() {
        let mut data = vec![0u8; 25];
        data[2 * 5 + 2] = 255;
        let raw = Mask::from_raw(5, 5, data).unwrap();

        assert!(smooth(&raw).is_empty());
    }

    #[test]
    fn test_fills_single_pixel_hole() {
        let mut data = vec![255u8; 25];
        data[2 * 5 + 2] = 0;
        let raw = Mask::from_raw(5, 5, data).unwrap();

        assert_eq!(smooth(&raw).get(2, 2), 255);
    }

    #[test]
    fn test_four_of_nine_is_not_a_majority() {
        // Centre pixel sees exactly four set neighbours in its window
        #[rustfmt::skip]
        let raw = Mask::from_raw(3, 3, vec![
            255, 255, 0,
            255, 255, 0,
              0,   0, 0,
        ])
        .unwrap();
        assert_eq!(smooth(&raw).get(1, 1), 0);

        #[rustfmt::skip]
        let raw = Mask::from_raw(3, 3, vec![
            255, 255, 255,
            255, 255,   0,
              0,   0,   0,
        ])
        .unwrap();
        assert_eq!(smooth(&raw).get(1, 1), 255);
    }

    #[test]
    fn test_output_is_binary() {
        let data: Vec<u8> = (0..49).map(|i| (i * 37 % 256) as u8).collect();
        let smoothed = smooth(&Mask::from_raw(7, 7, data).unwrap());
        assert!(smoothed.as_array().iter().all(|&a| a == 0 || a == 255));
    }

    #[test]
    fn test_tiny_masks_smooth_to_empty() {
        assert!(smooth(&filled(2, 8)).is_empty());
        assert_eq!(smooth(&filled(2, 8)).dimensions(), (2, 8));
        assert!(smooth(&filled(0, 0)).is_empty());
    }
}
