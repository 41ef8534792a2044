//! Saving an editing session to disk and rebuilding it later.
//!
//! A project directory holds `project.json` (the manifest) and one mask PNG per
//! layer under `masks/`. Reopening decodes the masks in parallel and pushes the
//! layers back in their stored order. A layer whose mask is missing, corrupt
//! or the wrong size is skipped and reported; the rest still render.

mod record;

pub use record::{LayerRecord, ProjectManifest};

use crate::compositor::CompositeError;
use crate::export::ExportScale;
use crate::layers::{Layer, LayerId, StackError};
use crate::mask::{self, MaskError};
use crate::selection::SelectionConfig;
use crate::session::{Session, SessionError};
use crate::source::{FileSource, ImageSource, SourceError};
use image::RgbaImage;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_NAME: &str = "project.json";
pub const MASK_DIR: &str = "masks";

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid project manifest {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("layer {id}: unusable mask")]
    Mask {
        id: LayerId,
        #[source]
        source: MaskError,
    },

    #[error("layer {id}: rejected")]
    Layer {
        id: LayerId,
        #[source]
        source: StackError,
    },

    #[error("base image is {found:?} but the project expects {expected:?}")]
    BaseMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Composite(#[from] CompositeError),
}

/// A stored layer that could not be restored.
#[derive(Debug)]
pub struct SkippedLayer {
    pub id: LayerId,
    pub error: ProjectError,
}

/// Write `session` as a project under `dir`, returning the manifest path.
///
/// `image` is recorded as an absolute path so the project can be opened from
/// anywhere.
pub fn save(session: &Session, image: &Path, dir: &Path) -> Result<PathBuf, ProjectError> {
    let _span = tracing::debug_span!("save_project").entered();

    let mask_dir = dir.join(MASK_DIR);
    fs::create_dir_all(&mask_dir).map_err(|source| ProjectError::Io {
        path: mask_dir.clone(),
        source,
    })?;
    let image = fs::canonicalize(image).map_err(|source| ProjectError::Io {
        path: image.to_path_buf(),
        source,
    })?;

    let mut layers = Vec::with_capacity(session.stack().len());
    for layer in session.stack().layers() {
        let relative = Path::new(MASK_DIR).join(format!("{}.png", layer.id()));
        let bytes = mask::encode_png(layer.mask()).map_err(|source| ProjectError::Mask {
            id: layer.id(),
            source,
        })?;
        write(&dir.join(&relative), &bytes)?;
        layers.push(LayerRecord::from_layer(layer, relative));
    }

    let (width, height) = session.base().dimensions();
    let manifest = ProjectManifest {
        image,
        width,
        height,
        layers,
    };

    let manifest_path = dir.join(MANIFEST_NAME);
    let json = serde_json::to_vec_pretty(&manifest).map_err(|source| ProjectError::Json {
        path: manifest_path.clone(),
        source,
    })?;
    write(&manifest_path, &json)?;

    tracing::info!(
        "Saved {} layers to {}",
        manifest.layers.len(),
        manifest_path.display()
    );
    Ok(manifest_path)
}

pub fn load_manifest(path: &Path) -> Result<ProjectManifest, ProjectError> {
    let bytes = fs::read(path).map_err(|source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ProjectError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Restore the layers of `manifest`, resolving mask paths against `root`.
///
/// Masks decode in parallel; the returned layers keep manifest order.
pub fn replay(manifest: &ProjectManifest, root: &Path) -> (Vec<Layer>, Vec<SkippedLayer>) {
    let _span = tracing::debug_span!("replay", layers = manifest.layers.len()).entered();
    let size = (manifest.width, manifest.height);

    let loaded: Vec<_> = manifest
        .layers
        .par_iter()
        .map(|record| (record.id, load_layer(record, root, size)))
        .collect();

    let mut layers = Vec::with_capacity(loaded.len());
    let mut skipped = Vec::new();
    for (id, result) in loaded {
        match result {
            Ok(layer) => layers.push(layer),
            Err(error) => {
                tracing::warn!("Skipping layer {}: {}", id, error_chain(&error));
                skipped.push(SkippedLayer { id, error });
            }
        }
    }

    (layers, skipped)
}

/// Reopen a saved project as a live session.
pub fn open(
    manifest_path: &Path,
    config: SelectionConfig,
) -> Result<(Session, Vec<SkippedLayer>), ProjectError> {
    tracing::info!("Opening project {}", manifest_path.display());

    let manifest = load_manifest(manifest_path)?;
    let root = manifest_path.parent().unwrap_or_else(|| Path::new("."));

    let base = FileSource::new(root.join(&manifest.image)).load()?;
    let expected = (manifest.width, manifest.height);
    if base.dimensions() != expected {
        return Err(ProjectError::BaseMismatch {
            expected,
            found: base.dimensions(),
        });
    }

    let (layers, mut skipped) = replay(&manifest, root);
    let mut session = Session::new(base, config);
    for layer in layers {
        let id = layer.id();
        if let Err(SessionError::Stack(source)) = session.push_layer(layer) {
            tracing::warn!("Skipping layer {}: {}", id, source);
            skipped.push(SkippedLayer {
                id,
                error: ProjectError::Layer { id, source },
            });
        }
    }

    tracing::info!(
        "Restored {} layers ({} skipped)",
        session.stack().len(),
        skipped.len()
    );
    Ok((session, skipped))
}

/// Render a saved project without keeping the session around.
pub fn render(
    manifest_path: &Path,
    scale: ExportScale,
) -> Result<(RgbaImage, Vec<SkippedLayer>), ProjectError> {
    let (session, skipped) = open(manifest_path, SelectionConfig::default())?;
    let image = session.export(scale)?;
    Ok((image, skipped))
}

fn load_layer(record: &LayerRecord, root: &Path, size: (u32, u32)) -> Result<Layer, ProjectError> {
    let id = record.id;
    let path = root.join(&record.mask);
    let bytes = fs::read(&path).map_err(|source| ProjectError::Io { path, source })?;

    let mask = mask::decode(&bytes).map_err(|source| ProjectError::Mask { id, source })?;
    if mask.dimensions() != size {
        return Err(ProjectError::Layer {
            id,
            source: StackError::DimensionMismatch {
                expected: size,
                found: mask.dimensions(),
            },
        });
    }

    let layer = Layer::new(mask, record.fill_hex, record.opacity)
        .map_err(|source| ProjectError::Layer { id, source })?;

    Ok(layer
        .with_id(id)
        .with_seed(record.seed())
        .with_blend(record.blend_mode)
        .with_label(record.part_label.clone(), record.confidence))
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), ProjectError> {
    fs::write(path, bytes).map_err(|source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
