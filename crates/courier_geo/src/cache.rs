use std::{
    fs::File,
    hash::{Hash, Hasher},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use fxhash::FxHasher64;
use tracing::{debug, warn};

use crate::{travel_matrices::TravelMatrices, travel_matrix_provider::TravelMatrixProvider};

pub const CACHE_FOLDER_ENV_VAR: &str = "COURIER_CACHE_FOLDER";

pub trait MatricesCache {
    fn cache<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
        matrices: &TravelMatrices,
    ) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>;

    fn get_cached<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
    ) -> Result<Option<TravelMatrices>, anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>;
}

/// Never caches anything.
#[derive(Default, Clone, Copy)]
pub struct NoopMatricesCache;

impl MatricesCache for NoopMatricesCache {
    fn cache<P>(
        &self,
        _provider: &TravelMatrixProvider,
        _points: &[P],
        _matrices: &TravelMatrices,
    ) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        Ok(())
    }

    fn get_cached<P>(
        &self,
        _provider: &TravelMatrixProvider,
        _points: &[P],
    ) -> Result<Option<TravelMatrices>, anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        Ok(None)
    }
}

/// Stores matrices as JSON files named after a hash of the points and the provider.
#[derive(Clone)]
pub struct FileMatricesCache {
    folder: PathBuf,
}

impl FileMatricesCache {
    pub fn new(folder: impl Into<PathBuf>) -> Result<Self, anyhow::Error> {
        let folder = folder.into();
        anyhow::ensure!(
            folder.is_dir(),
            "Matrix cache folder {} is not a directory",
            folder.display()
        );

        Ok(FileMatricesCache { folder })
    }

    /// Folder named by `COURIER_CACHE_FOLDER`.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let folder = std::env::var(CACHE_FOLDER_ENV_VAR)
            .with_context(|| format!("{CACHE_FOLDER_ENV_VAR} is not set"))?;
        FileMatricesCache::new(folder)
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

fn hash_points<H, P>(points: &[P], hasher: &mut H)
where
    H: Hasher,
    for<'a> &'a P: Into<geo_types::Point>,
{
    points.len().hash(hasher);
    for point in points {
        let point: geo_types::Point = point.into();
        hasher.write_u64(point.x().to_bits());
        hasher.write_u64(point.y().to_bits());
    }
}

/// File name of the entry for `points` resolved by `provider`.
pub fn cache_key<P>(points: &[P], provider: &TravelMatrixProvider) -> String
where
    for<'a> &'a P: Into<geo_types::Point>,
{
    let mut hasher = FxHasher64::default();
    hash_points(points, &mut hasher);
    provider.hash(&mut hasher);

    format!("{:016x}.json", hasher.finish())
}

impl MatricesCache for FileMatricesCache {
    fn cache<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
        matrices: &TravelMatrices,
    ) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        let path = self.folder.join(cache_key(points, provider));
        let file = File::create(&path)
            .with_context(|| format!("Cannot create cache entry {}", path.display()))?;

        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        serde_json::to_writer(&mut writer, matrices)?;
        writer.flush()?;

        debug!(path = %path.display(), points = points.len(), "Cached travel matrices");

        Ok(())
    }

    /// A corrupt entry, or one that does not match `points`, is a miss.
    fn get_cached<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
    ) -> Result<Option<TravelMatrices>, anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        let path = self.folder.join(cache_key(points, provider));
        if !path.is_file() {
            return Ok(None);
        }

        let file = File::open(&path)
            .with_context(|| format!("Cannot open cache entry {}", path.display()))?;

        let matrices = match serde_json::from_reader::<_, TravelMatrices>(BufReader::new(file)) {
            Ok(matrices) => matrices,
            Err(err) => {
                warn!(path = %path.display(), %err, "Ignoring unreadable cache entry");
                return Ok(None);
            }
        };

        if let Err(err) = matrices.validate(points.len()) {
            warn!(path = %path.display(), %err, "Ignoring mismatched cache entry");
            return Ok(None);
        }

        Ok(Some(matrices))
    }
}

#[cfg(test)]
mod tests {
    use geo_types::Point;

    use super::*;

    struct TestPoint(Point);

    impl From<&TestPoint> for Point {
        fn from(value: &TestPoint) -> Self {
            value.0
        }
    }

    #[test]
    fn test_cache_key_depends_on_points_and_provider() {
        let points = vec![TestPoint(Point::new(1.0, 2.0))];
        let other_points = vec![TestPoint(Point::new(2.0, 1.0))];
        let provider = TravelMatrixProvider::AsTheCrowFlies { speed_kmh: 20.0 };
        let other_provider = TravelMatrixProvider::AsTheCrowFlies { speed_kmh: 30.0 };

        let filename = cache_key(&points, &provider);
        assert!(filename.ends_with(".json"));
        assert_eq!(filename, cache_key(&points, &provider));
        assert_ne!(filename, cache_key(&other_points, &provider));
        assert_ne!(filename, cache_key(&points, &other_provider));
    }

    #[test]
    fn test_file_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileMatricesCache::new(dir.path()).unwrap();
        let points = vec![TestPoint(Point::new(1.0, 2.0)), TestPoint(Point::new(1.5, 2.0))];
        let provider = TravelMatrixProvider::AsTheCrowFlies { speed_kmh: 20.0 };

        assert!(cache.get_cached(&provider, &points).unwrap().is_none());

        let matrices = TravelMatrices {
            distances: vec![0.0, 1.0, 1.0, 0.0],
            times: vec![0.0, 2.0, 2.0, 0.0],
        };
        cache.cache(&provider, &points, &matrices).unwrap();

        assert_eq!(cache.get_cached(&provider, &points).unwrap(), Some(matrices));
    }

    #[test]
    fn test_mismatched_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileMatricesCache::new(dir.path()).unwrap();
        let points = vec![TestPoint(Point::new(1.0, 2.0)), TestPoint(Point::new(1.5, 2.0))];
        let provider = TravelMatrixProvider::AsTheCrowFlies { speed_kmh: 20.0 };

        let single_point = TravelMatrices {
            distances: vec![0.0],
            times: vec![0.0],
        };
        cache.cache(&provider, &points, &single_point).unwrap();
        assert!(cache.get_cached(&provider, &points).unwrap().is_none());

        std::fs::write(dir.path().join(cache_key(&points, &provider)), "{ not json").unwrap();
        assert!(cache.get_cached(&provider, &points).unwrap().is_none());
    }

    #[test]
    fn test_file_cache_requires_directory() {
        assert!(FileMatricesCache::new("/this/path/does/not/exist").is_err());
    }
}
