//! Image volumes, the volume cache and asynchronous volume loading.
//!
//! The cache and the loader are owned by the host application. The core only
//! needs synchronous lookups into the cache and a way to await a load without
//! holding a borrow on the editing session.

use crate::error::{Result, SegmentationError};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

/// Boxed future for loader results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Backing volume shared by every representation that references it.
pub type SharedVolume = Rc<RefCell<ImageVolume>>;

/// Spatial metadata of a volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeMetadata {
    pub frame_of_reference_uid: String,
    /// World position of voxel (0, 0, 0).
    pub origin: DVec3,
    /// Voxel size along the i, j and k axes.
    pub spacing: DVec3,
    /// World direction of the i, j and k axes. Assumed orthonormal.
    pub direction: [DVec3; 3],
}

impl VolumeMetadata {
    /// Axis-aligned metadata with unit spacing.
    pub fn identity(frame_of_reference_uid: impl Into<String>) -> Self {
        Self {
            frame_of_reference_uid: frame_of_reference_uid.into(),
            origin: DVec3::ZERO,
            spacing: DVec3::ONE,
            direction: [DVec3::X, DVec3::Y, DVec3::Z],
        }
    }
}

/// Voxel values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarData {
    Uint8(Vec<u8>),
    Int16(Vec<i16>),
    Float32(Vec<f32>),
}

impl ScalarData {
    pub fn len(&self) -> usize {
        match self {
            ScalarData::Uint8(v) => v.len(),
            ScalarData::Int16(v) => v.len(),
            ScalarData::Float32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A 3D image or label volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageVolume {
    pub volume_id: String,
    pub dimensions: [usize; 3],
    pub metadata: VolumeMetadata,
    pub scalar_data: ScalarData,
}

impl ImageVolume {
    /// Create a volume, checking that the data matches the dimensions.
    pub fn new(
        volume_id: impl Into<String>,
        dimensions: [usize; 3],
        metadata: VolumeMetadata,
        scalar_data: ScalarData,
    ) -> Result<Self> {
        let volume_id = volume_id.into();
        let expected = dimensions.iter().product::<usize>();
        if scalar_data.len() != expected {
            return Err(SegmentationError::InvalidInput(format!(
                "volume '{}' has {} voxels but dimensions {:?} require {}",
                volume_id,
                scalar_data.len(),
                dimensions,
                expected
            )));
        }
        Ok(Self {
            volume_id,
            dimensions,
            metadata,
            scalar_data,
        })
    }

    /// Create an empty 8-bit label volume.
    pub fn labelmap(
        volume_id: impl Into<String>,
        dimensions: [usize; 3],
        metadata: VolumeMetadata,
    ) -> Self {
        Self {
            volume_id: volume_id.into(),
            dimensions,
            metadata,
            scalar_data: ScalarData::Uint8(vec![0; dimensions.iter().product()]),
        }
    }

    pub fn voxel_count(&self) -> usize {
        self.dimensions.iter().product()
    }

    /// Linear index of voxel `(i, j, k)`, `None` when outside the volume.
    pub fn linear_index(&self, ijk: [usize; 3]) -> Option<usize> {
        let [di, dj, dk] = self.dimensions;
        let [i, j, k] = ijk;
        (i < di && j < dj && k < dk).then(|| k * di * dj + j * di + i)
    }

    /// World position of a voxel centre.
    pub fn index_to_world(&self, ijk: [usize; 3]) -> DVec3 {
        let m = &self.metadata;
        m.origin
            + m.direction[0] * (ijk[0] as f64 * m.spacing.x)
            + m.direction[1] * (ijk[1] as f64 * m.spacing.y)
            + m.direction[2] * (ijk[2] as f64 * m.spacing.z)
    }

    /// Continuous voxel coordinates of a world point.
    pub fn world_to_index(&self, world: DVec3) -> DVec3 {
        let m = &self.metadata;
        let d = world - m.origin;
        DVec3::new(
            d.dot(m.direction[0]) / m.spacing.x,
            d.dot(m.direction[1]) / m.spacing.y,
            d.dot(m.direction[2]) / m.spacing.z,
        )
    }

    /// Label value of a voxel of an 8-bit volume.
    pub fn label_at(&self, ijk: [usize; 3]) -> Option<u8> {
        let index = self.linear_index(ijk)?;
        match &self.scalar_data {
            ScalarData::Uint8(v) => v.get(index).copied(),
            _ => None,
        }
    }

    /// Mutable label storage. Fails unless the volume holds 8-bit data.
    pub fn labels_mut(&mut self) -> Result<&mut [u8]> {
        match &mut self.scalar_data {
            ScalarData::Uint8(v) => Ok(v.as_mut_slice()),
            _ => Err(SegmentationError::InvalidInput(format!(
                "volume '{}' does not hold 8-bit label data",
                self.volume_id
            ))),
        }
    }

    /// Number of voxels equal to `label`.
    pub fn count_label(&self, label: u8) -> usize {
        match &self.scalar_data {
            ScalarData::Uint8(v) => v.iter().filter(|&&x| x == label).count(),
            _ => 0,
        }
    }
}

/// Synchronous lookup into the externally owned volume cache.
pub trait VolumeCache {
    /// Get a cached volume.
    fn get_volume(&self, volume_id: &str) -> Option<SharedVolume>;

    /// Insert (or replace) a volume, returning the shared handle.
    fn put_volume(&self, volume: ImageVolume) -> SharedVolume;

    /// Drop a volume from the cache.
    fn remove_volume(&self, volume_id: &str) -> bool;
}

/// In-memory volume cache.
#[derive(Default)]
pub struct InMemoryVolumeCache {
    volumes: RefCell<HashMap<String, SharedVolume>>,
}

impl InMemoryVolumeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.volumes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.borrow().is_empty()
    }
}

impl VolumeCache for InMemoryVolumeCache {
    fn get_volume(&self, volume_id: &str) -> Option<SharedVolume> {
        self.volumes.borrow().get(volume_id).cloned()
    }

    fn put_volume(&self, volume: ImageVolume) -> SharedVolume {
        let id = volume.volume_id.clone();
        let shared = Rc::new(RefCell::new(volume));
        self.volumes.borrow_mut().insert(id, Rc::clone(&shared));
        shared
    }

    fn remove_volume(&self, volume_id: &str) -> bool {
        self.volumes.borrow_mut().remove(volume_id).is_some()
    }
}

/// Asynchronous source of volume data.
///
/// The returned future must not borrow the loader so it can be awaited while
/// the editing session keeps handling input.
pub trait VolumeLoader {
    fn load(&self, volume_id: &str) -> BoxFuture<'static, Result<ImageVolume>>;
}

/// Loader serving pre-registered volumes, for tests and headless sessions.
#[derive(Default)]
pub struct InMemoryVolumeLoader {
    sources: RefCell<HashMap<String, ImageVolume>>,
}

impl InMemoryVolumeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a volume that later `load` calls will return.
    pub fn register(&self, volume: ImageVolume) {
        self.sources
            .borrow_mut()
            .insert(volume.volume_id.clone(), volume);
    }
}

impl VolumeLoader for InMemoryVolumeLoader {
    fn load(&self, volume_id: &str) -> BoxFuture<'static, Result<ImageVolume>> {
        let found = self.sources.borrow().get(volume_id).cloned();
        let volume_id = volume_id.to_string();
        Box::pin(async move {
            found.ok_or_else(|| SegmentationError::Load {
                volume_id,
                reason: "no such volume registered".to_string(),
            })
        })
    }
}

/// Load a volume and place it in the cache. Already cached volumes are
/// returned without calling the loader.
pub async fn load_into_cache(
    loader: Rc<dyn VolumeLoader>,
    cache: Rc<dyn VolumeCache>,
    volume_id: String,
) -> Result<SharedVolume> {
    if let Some(existing) = cache.get_volume(&volume_id) {
        return Ok(existing);
    }
    log::debug!("Loading volume {}", volume_id);
    let volume = loader.load(&volume_id).await?;
    if volume.volume_id != volume_id {
        return Err(SegmentationError::Load {
            volume_id,
            reason: format!("loader returned volume '{}'", volume.volume_id),
        });
    }
    log::info!("Loaded volume {} ({} voxels)", volume_id, volume.voxel_count());
    Ok(cache.put_volume(volume))
}
