use super::types::{Prompt, Segment, SegmentationError, SegmentationModel};
use crate::compositor::{self, NearestMap};
use crate::mask::{self, Mask};
use crate::selection::SelectionError;
use image::RgbaImage;
use ndarray::Array2;
use std::fs;
use std::path::Path;

/// Masks produced ahead of time by an external segmentation service.
///
/// Each mask is an image whose alpha (or luma) is occupancy. A point prompt
/// returns the masks covering the clicked pixel, smallest first, so the most
/// specific part wins; `Everything` returns all of them in load order.
pub struct ExternalMasks {
    segments: Vec<Segment>,
}

impl ExternalMasks {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Decode labelled mask images.
    pub fn from_encoded<I, S>(encoded: I) -> Result<Self, SegmentationError>
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: Into<String>,
    {
        let segments = encoded
            .into_iter()
            .map(|(label, bytes)| {
                let label = label.into();
                let mask = mask::decode(&bytes).map_err(|e| {
                    SegmentationError::ExternalService(format!("mask {label:?}: {e}"))
                })?;
                Ok(Segment::from_mask(mask).with_label(label))
            })
            .collect::<Result<Vec<_>, SegmentationError>>()?;

        Ok(Self::new(segments))
    }

    /// Load every `.png` in `dir`, sorted by file name; labels are file stems.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, SegmentationError> {
        let dir = dir.as_ref();
        tracing::info!("Loading external masks from {}", dir.display());

        let unreadable =
            |e: std::io::Error| SegmentationError::ExternalService(format!("{}: {e}", dir.display()));

        let mut paths: Vec<_> = fs::read_dir(dir)
            .map_err(unreadable)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
            })
            .collect();
        paths.sort();

        let mut encoded = Vec::with_capacity(paths.len());
        for path in &paths {
            let bytes = fs::read(path).map_err(unreadable)?;
            let label = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            encoded.push((label, bytes));
        }

        let masks = Self::from_encoded(encoded)?;
        tracing::info!("Loaded {} external masks", masks.len());
        Ok(masks)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Bring a service mask to the image's size, keeping metadata.
///
/// Masks at another resolution are resampled nearest-neighbour with the same
/// mapping the compositor uses.
fn fit_to(segment: &Segment, width: u32, height: u32) -> Segment {
    if segment.mask.dimensions() == (width, height) {
        return segment.clone();
    }

    tracing::debug!(
        "Resizing external mask {:?} from {:?} to {}x{}",
        segment.label,
        segment.mask.dimensions(),
        width,
        height
    );
    let map = NearestMap::new(segment.mask.dimensions(), (width, height));
    let mut resized = Array2::<u8>::zeros((height as usize, width as usize));
    for (i, sx, sy) in map.iter() {
        resized[[i / width as usize, i % width as usize]] = segment.mask.get(sx, sy);
    }

    Segment {
        label: segment.label.clone(),
        confidence: segment.confidence,
        ..Segment::from_mask(Mask::from(resized))
    }
}

impl SegmentationModel for ExternalMasks {
    fn segment(&mut self, image: &RgbaImage, prompt: Prompt) -> Result<Vec<Segment>, SegmentationError> {
        let _span = tracing::debug_span!("external_segment").entered();
        let (width, height) = image.dimensions();

        if self.segments.is_empty() {
            return Err(SegmentationError::ExternalService(
                "service returned no masks".to_string(),
            ));
        }

        match prompt {
            Prompt::Everything => Ok(self
                .segments
                .iter()
                .map(|s| fit_to(s, width, height))
                .filter(|s| s.mask.is_paintable())
                .collect()),
            Prompt::Point(seed) => {
                if !seed.in_bounds(width, height) {
                    return Err(SelectionError::InvalidSeed {
                        x: seed.x,
                        y: seed.y,
                        width,
                        height,
                    }
                    .into());
                }
                // Hit-test in each mask's own resolution, then fit only the hits
                let mut hits: Vec<_> = self
                    .segments
                    .iter()
                    .filter(|s| {
                        let (sx, sy) =
                            NearestMap::source_of(s.mask.dimensions(), (width, height), seed.x, seed.y);
                        compositor::covers(s.mask.get(sx, sy))
                    })
                    .map(|s| fit_to(s, width, height))
                    .collect();
                hits.sort_by_key(|s| s.area);
                Ok(hits)
            }
        }
    }

    fn name(&self) -> &'static str {
        "external"
    }
}
