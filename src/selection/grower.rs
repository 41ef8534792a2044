use super::{Seed, SelectionConfig, SelectionError};
use crate::mask::Mask;
use image::{Rgba, RgbaImage};
use ndarray::Array2;

/// Euclidean distance between the RGB parts of two pixels; alpha is ignored.
pub fn color_distance(a: &Rgba<u8>, b: &Rgba<u8>) -> f32 {
    squared_distance(a, b).sqrt()
}

fn squared_distance(a: &Rgba<u8>, b: &Rgba<u8>) -> f32 {
    (0..3)
        .map(|c| {
            let d = a[c] as f32 - b[c] as f32;
            d * d
        })
        .sum()
}

/// Grow a region of similar color from `seed` over 4-connected neighbours.
///
/// A pixel joins when it is visible (alpha above `config.alpha_threshold`)
/// and within `config.cutoff()` of the seed's RGB. Returns an all-zero mask
/// when the seed itself is transparent. The result is the raw, unsmoothed mask.
pub fn grow(image: &RgbaImage, seed: Seed, config: &SelectionConfig) -> Result<Mask, SelectionError> {
    config.validate()?;

    let (width, height) = image.dimensions();
    if !seed.in_bounds(width, height) {
        return Err(SelectionError::InvalidSeed {
            x: seed.x,
            y: seed.y,
            width,
            height,
        });
    }

    let _span = tracing::debug_span!("grow", x = seed.x, y = seed.y).entered();

    let (w, h) = (width as usize, height as usize);
    let mut alpha = Array2::<u8>::zeros((h, w));

    let target = *image.get_pixel(seed.x, seed.y);
    if target[3] <= config.alpha_threshold {
        tracing::debug!("Seed ({}, {}) is transparent, nothing to grow", seed.x, seed.y);
        return Ok(Mask::from(alpha));
    }

    let cutoff = config.cutoff();
    let cutoff_sq = cutoff * cutoff;
    let threshold = config.alpha_threshold;
    let accepts = |x: usize, y: usize| {
        let pixel = image.get_pixel(x as u32, y as u32);
        pixel[3] > threshold && squared_distance(pixel, &target) <= cutoff_sq
    };

    // Every pixel is tested once, when first discovered
    let mut visited = vec![false; w * h];
    let mut stack: Vec<usize> = Vec::with_capacity(4096);

    let seed_idx = seed.y as usize * w + seed.x as usize;
    visited[seed_idx] = true;
    stack.push(seed_idx);

    let mut filled = 0usize;
    while let Some(idx) = stack.pop() {
        let (x, y) = (idx % w, idx / w);
        alpha[[y, x]] = 255;
        filled += 1;

        let mut visit = |nx: usize, ny: usize| {
            let ni = ny * w + nx;
            if !visited[ni] {
                visited[ni] = true;
                if accepts(nx, ny) {
                    stack.push(ni);
                }
            }
        };

        if x > 0 {
            visit(x - 1, y);
        }
        if x + 1 < w {
            visit(x + 1, y);
        }
        if y > 0 {
            visit(x, y - 1);
        }
        if y + 1 < h {
            visit(x, y + 1);
        }
    }

    tracing::debug!(
        "Grew {} pixels from ({}, {}) with cutoff {:.1}",
        filled,
        seed.x,
        seed.y,
        cutoff
    );

    Ok(Mask::from(alpha))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn config(tolerance: f32) -> SelectionConfig {
        SelectionConfig {
            tolerance,
            ..SelectionConfig::default()
        }
    }

    /// Horizontal gray ramp: column x has value x * step.
    fn ramp(width: u32, height: u32, step: u8) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, _| {
            let v = (x as u8).saturating_mul(step);
            Rgba([v, v, v, 255])
        })
    }

    #[test]
    fn test_solid_image_selects_everything() {
        let image = RgbaImage::from_pixel(4, 4, RED);
        let mask = grow(&image, Seed::new(0, 0), &config(0.0)).unwrap();

        assert_eq!(mask.area(), 16);
        assert!(mask.as_array().iter().all(|&a| a == 255));
    }

    #[test]
    fn test_stops_at_color_edge() {
        // Left half red, right half blue
        let image = RgbaImage::from_fn(4, 4, |x, _| if x < 2 { RED } else { BLUE });
        let mask = grow(&image, Seed::new(0, 3), &SelectionConfig::default()).unwrap();

        assert_eq!(mask.area(), 8);
        for y in 0..4 {
            assert_eq!(mask.get(1, y), 255);
            assert_eq!(mask.get(2, y), 0);
        }
    }

    #[test]
    fn test_does_not_jump_to_disconnected_match() {
        // Red columns 0 and 4 separated by a blue wall
        let image = RgbaImage::from_fn(5, 3, |x, _| if x == 2 { BLUE } else { RED });
        let mask = grow(&image, Seed::new(0, 1), &config(10.0)).unwrap();

        assert_eq!(mask.get(1, 1), 255);
        assert_eq!(mask.get(3, 1), 0);
        assert_eq!(mask.get(4, 1), 0);
    }

    #[test]
    fn test_four_connectivity_only() {
        // Diagonal neighbours do not connect
        let image = RgbaImage::from_fn(2, 2, |x, y| if x == y { RED } else { BLUE });
        let mask = grow(&image, Seed::new(0, 0), &config(5.0)).unwrap();

        assert_eq!(mask.area(), 1);
    }

    #[test]
    fn test_transparent_seed_gives_empty_mask() {
        let mut image = RgbaImage::from_pixel(3, 3, RED);
        image.put_pixel(1, 1, Rgba([255, 0, 0, 0]));

        let mask = grow(&image, Seed::new(1, 1), &config(255.0)).unwrap();
        assert!(mask.is_empty());
    }

    #[test]
    fn test_transparent_pixels_never_join() {
        let image = RgbaImage::from_fn(3, 1, |x, _| {
            if x == 1 {
                Rgba([255, 0, 0, 5])
            } else {
                RED
            }
        });
        let mask = grow(&image, Seed::new(0, 0), &config(255.0)).unwrap();

        assert_eq!(mask.area(), 1);
    }

    #[test]
    fn test_seed_out_of_bounds() {
        let image = RgbaImage::from_pixel(3, 3, RED);
        let err = grow(&image, Seed::new(3, 0), &config(30.0)).unwrap_err();

        assert!(matches!(
            err,
            SelectionError::InvalidSeed { x: 3, y: 0, width: 3, height: 3 }
        ));
    }

    #[test]
    fn test_cutoff_uses_scaled_euclidean_distance() {
        // Distance from (100,100,100) to (120,120,120) is 20 * sqrt(3) ~ 34.6
        let image = RgbaImage::from_fn(2, 1, |x, _| {
            let v = if x == 0 { 100 } else { 120 };
            Rgba([v, v, v, 255])
        });

        // 20 * 1.7 = 34.0 < 34.6
        assert_eq!(grow(&image, Seed::new(0, 0), &config(20.0)).unwrap().area(), 1);
        // 21 * 1.7 = 35.7 >= 34.6
        assert_eq!(grow(&image, Seed::new(0, 0), &config(21.0)).unwrap().area(), 2);
    }

    #[test]
    fn test_rejects_negative_and_non_finite_tolerance() {
        // Gray ramp 100, 105, ..., 125
        let image = RgbaImage::from_fn(6, 1, |x, _| {
            let v = 100 + x as u8 * 5;
            Rgba([v, v, v, 255])
        });

        for tolerance in [-30.0, -0.5, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                grow(&image, Seed::new(0, 0), &config(tolerance)),
                Err(SelectionError::InvalidTolerance(_))
            ));
        }
        assert_eq!(grow(&image, Seed::new(0, 0), &config(0.0)).unwrap().area(), 1);
    }

    #[test]
    fn test_growth_is_repeatable() {
        let image = ramp(16, 6, 9);
        let first = grow(&image, Seed::new(7, 2), &config(12.0)).unwrap();
        let second = grow(&image, Seed::new(7, 2), &config(12.0)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_larger_tolerance_never_shrinks() {
        let image = RgbaImage::from_fn(12, 12, |x, y| {
            let v = ((x * 13 + y * 7) % 64) as u8 * 3;
            Rgba([v, 255 - v, v / 2, 255])
        });
        let seed = Seed::new(5, 5);

        let mut previous = grow(&image, seed, &config(0.0)).unwrap();
        for tolerance in [5.0, 10.0, 20.0, 40.0, 80.0, 160.0] {
            let current = grow(&image, seed, &config(tolerance)).unwrap();
            for (before, after) in previous.as_array().iter().zip(current.as_array().iter()) {
                assert!(*before == 0 || *after == 255);
            }
            previous = current;
        }
    }

    #[test]
    fn test_every_selected_pixel_is_reachable() {
        let image = RgbaImage::from_fn(10, 10, |x, y| {
            let v = ((x * x + y * 3) % 50) as u8 * 5;
            Rgba([v, v, v, 255])
        });
        let seed = Seed::new(4, 4);
        let cfg = config(15.0);
        let mask = grow(&image, seed, &cfg).unwrap();

        // Independent BFS restricted to selected, in-tolerance pixels
        let target = *image.get_pixel(seed.x, seed.y);
        let mut reached = vec![false; 100];
        let mut queue = VecDeque::from([(seed.x, seed.y)]);
        reached[(seed.y * 10 + seed.x) as usize] = true;
        while let Some((x, y)) = queue.pop_front() {
            let neighbours = [
                (x.wrapping_sub(1), y),
                (x + 1, y),
                (x, y.wrapping_sub(1)),
                (x, y + 1),
            ];
            for (nx, ny) in neighbours {
                if nx >= 10 || ny >= 10 || reached[(ny * 10 + nx) as usize] {
                    continue;
                }
                if mask.get(nx, ny) == 255 {
                    assert!(color_distance(image.get_pixel(nx, ny), &target) <= cfg.cutoff());
                    reached[(ny * 10 + nx) as usize] = true;
                    queue.push_back((nx, ny));
                }
            }
        }

        for y in 0..10 {
            for x in 0..10 {
                if mask.get(x, y) == 255 {
                    assert!(reached[(y * 10 + x) as usize], "({x}, {y}) is disconnected");
                }
            }
        }
    }
}
