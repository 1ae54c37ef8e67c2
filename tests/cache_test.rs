mod common;

use std::path::{Path, PathBuf};

use common::{CountingDetector, CountingLoader, CountingMatcher, blob_image, point_with_descriptor};
use dem_align::cache::FeatureCache;
use dem_align::config::DetectorConfig;
use dem_align::data_loader::RasterLoader;
use dem_align::detected_points::{CorrespondenceSet, InterestPoint};
use dem_align::detector::LogDetector;
use dem_align::error::AlignError;
use dem_align::io::{object_from_json_bytes, object_to_json_bytes};
use dem_align::matching::RatioMatcher;
use dem_align::store::{ArtifactKey, ArtifactStore, FsStore, MemoryStore};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

fn sample_points() -> Vec<InterestPoint> {
    vec![
        point_with_descriptor(0.1, 1.0 / 3.0, vec![0.25, -0.5, 1e-300]),
        point_with_descriptor(12.75, 3.0, vec![std::f64::consts::PI, 0.0, -2.0]),
        point_with_descriptor(12.75, 4.0, vec![1.0, 1.0, 1.0]),
    ]
}

fn counting_cache(
    store: MemoryStore,
    pairs: Vec<(usize, usize)>,
) -> FeatureCache<MemoryStore, CountingLoader, CountingDetector, CountingMatcher> {
    FeatureCache::new(
        store,
        CountingLoader::default(),
        CountingDetector {
            points: sample_points(),
            ..Default::default()
        },
        CountingMatcher {
            pairs,
            ..Default::default()
        },
    )
}

fn put<T: serde::Serialize>(store: &mut MemoryStore, key: &ArtifactKey, value: &T) {
    let bytes = object_to_json_bytes(Path::new("test"), value).unwrap();
    store.write(key, &bytes).unwrap();
}

#[test]
fn test_interest_points_round_trip() {
    let points = sample_points();
    let bytes = object_to_json_bytes(Path::new("a.ipts"), &points).unwrap();
    let back: Vec<InterestPoint> = object_from_json_bytes(Path::new("a.ipts"), &bytes).unwrap();
    assert_eq!(back, points);
}

#[test]
fn test_correspondences_round_trip() {
    let points = sample_points();
    let set = CorrespondenceSet::new(points.clone(), points.into_iter().rev().collect()).unwrap();
    let bytes = object_to_json_bytes(Path::new("a__b.match"), &set).unwrap();
    let back: CorrespondenceSet = object_from_json_bytes(Path::new("a__b.match"), &bytes).unwrap();
    assert_eq!(back, set);
}

#[test]
fn test_correspondences_with_unequal_sides_do_not_parse() {
    let raw = r#"{"left": [{"x": 1.0, "y": 2.0, "scale": 1.0, "orientation": 0.0, "interest": 0.0, "descriptor": []}], "right": []}"#;
    let result: Result<CorrespondenceSet, _> =
        object_from_json_bytes(Path::new("bad.match"), raw.as_bytes());
    assert!(matches!(result, Err(AlignError::SourceUnreadable { .. })));
}

#[test]
fn test_cached_interest_points_skip_detection() {
    let image = PathBuf::from("/data/left.tif");
    let cached = vec![InterestPoint::at(5.0, 6.0)];
    let mut store = MemoryStore::new();
    put(&mut store, &ArtifactKey::interest_points(&image), &cached);

    let mut cache = counting_cache(store, vec![]);
    let points = cache.get_or_detect(&image).unwrap();

    assert_eq!(points, cached);
    assert_eq!(cache.loader().calls.get(), 0);
    assert_eq!(cache.detector().calls.get(), 0);
    assert_eq!(cache.store().len(), 1);
}

#[test]
fn test_cached_matches_skip_everything() {
    let left = PathBuf::from("/data/left.tif");
    let right = PathBuf::from("/data/right.tif");
    let cached = CorrespondenceSet::new(
        vec![InterestPoint::at(1.0, 1.0)],
        vec![InterestPoint::at(2.0, 2.0)],
    )
    .unwrap();
    let mut store = MemoryStore::new();
    put(&mut store, &ArtifactKey::matches(&left, &right), &cached);

    let mut cache = counting_cache(store, vec![(0, 0)]);
    let matches = cache.get_or_match(&left, &right).unwrap();

    assert_eq!(matches, cached);
    assert_eq!(cache.loader().calls.get(), 0);
    assert_eq!(cache.detector().calls.get(), 0);
    assert_eq!(cache.matcher().calls.get(), 0);
    // Per-image artifacts are not touched on a pair hit.
    assert!(!cache.store().exists(&ArtifactKey::interest_points(&left)));
}

#[test]
fn test_match_miss_detects_filters_and_caches() {
    let left = PathBuf::from("/data/left.tif");
    let right = PathBuf::from("/data/right.tif");
    // Left point 1 and right point 2 each appear twice, only the first pair survives.
    let pairs = vec![(0, 0), (1, 1), (1, 2), (2, 2)];
    let mut cache = counting_cache(MemoryStore::new(), pairs);

    let matches = cache.get_or_match(&left, &right).unwrap();
    assert_eq!(cache.loader().calls.get(), 2);
    assert_eq!(cache.detector().calls.get(), 2);
    assert_eq!(cache.matcher().calls.get(), 1);
    assert_eq!(matches.len(), 1);
    assert_eq!((matches.left()[0].x, matches.right()[0].x), (0.1, 0.1));

    assert_eq!(cache.store().len(), 3);
    for key in [
        ArtifactKey::interest_points(&left),
        ArtifactKey::interest_points(&right),
        ArtifactKey::matches(&left, &right),
    ] {
        assert!(cache.store().exists(&key), "missing {:?}", key);
    }

    let again = cache.get_or_match(&left, &right).unwrap();
    assert_eq!(again, matches);
    assert_eq!(cache.detector().calls.get(), 2);
    assert_eq!(cache.matcher().calls.get(), 1);
}

#[test]
fn test_swapped_pair_is_a_different_key() {
    let left = PathBuf::from("/data/left.tif");
    let right = PathBuf::from("/data/right.tif");
    let mut cache = counting_cache(MemoryStore::new(), vec![(0, 0)]);

    cache.get_or_match(&left, &right).unwrap();
    cache.get_or_match(&right, &left).unwrap();

    assert_eq!(cache.matcher().calls.get(), 2);
    // Interest points were reused from the first run.
    assert_eq!(cache.detector().calls.get(), 2);
    assert!(cache.store().exists(&ArtifactKey::matches(&right, &left)));
}

#[test]
fn test_unreadable_image_writes_nothing() {
    let mut cache = FeatureCache::new(
        MemoryStore::new(),
        CountingLoader {
            fail: true,
            ..Default::default()
        },
        CountingDetector::default(),
        CountingMatcher::default(),
    );
    let err = cache.get_or_detect(Path::new("/data/broken.tif")).unwrap_err();
    assert!(matches!(err, AlignError::SourceUnreadable { .. }));
    assert_eq!(cache.detector().calls.get(), 0);
    assert!(cache.store().is_empty());
}

#[test]
fn test_corrupt_artifact_is_unreadable() {
    let image = PathBuf::from("/data/left.tif");
    let mut store = MemoryStore::new();
    store
        .write(&ArtifactKey::interest_points(&image), b"{ not json")
        .unwrap();
    let mut cache = counting_cache(store, vec![]);
    let err = cache.get_or_detect(&image).unwrap_err();
    assert!(matches!(err, AlignError::SourceUnreadable { .. }));
    assert_eq!(cache.detector().calls.get(), 0);
}

#[test]
fn test_fs_store_paths() {
    let left = Path::new("/data/ortho/left.tif");
    let right = Path::new("/other/right.png");
    let store = FsStore::new();
    assert_eq!(
        store.path_for(&ArtifactKey::interest_points(left)),
        PathBuf::from("/data/ortho/left.ipts")
    );
    assert_eq!(
        store.path_for(&ArtifactKey::matches(left, right)),
        PathBuf::from("/data/ortho/left__right.match")
    );
    assert_eq!(
        store.path_for(&ArtifactKey::matches(right, left)),
        PathBuf::from("/other/right__left.match")
    );

    // A shared directory qualifies names with a digest of the full paths.
    let shared = FsStore::with_cache_dir("/cache");
    assert_eq!(
        shared.path_for(&ArtifactKey::interest_points(right)),
        PathBuf::from("/cache/right-07ccaa2fa10a9aec.ipts")
    );
    assert_eq!(
        shared.path_for(&ArtifactKey::matches("/x/a.tif", "/y/b.tif")),
        PathBuf::from("/cache/a__b-3c768d63d1c87f6b.match")
    );
}

#[test]
fn test_shared_cache_dir_keeps_same_stems_apart() {
    let store = FsStore::with_cache_dir("/cache");
    let first = store.path_for(&ArtifactKey::interest_points("/run1/DEM-DRG.tif"));
    let second = store.path_for(&ArtifactKey::interest_points("/run2/DEM-DRG.tif"));
    assert_ne!(first, second);
    assert_eq!(first.parent(), Some(Path::new("/cache")));

    let pair = store.path_for(&ArtifactKey::matches("/run1/a.tif", "/run1/b.tif"));
    let other_right = store.path_for(&ArtifactKey::matches("/run1/a.tif", "/run2/b.tif"));
    let swapped = store.path_for(&ArtifactKey::matches("/run1/b.tif", "/run1/a.tif"));
    assert_ne!(pair, other_right);
    assert_ne!(pair, swapped);
}

#[test]
fn test_same_stem_in_two_directories_detects_twice() {
    let temp_dir = TempDir::new().unwrap();
    let cache_dir = temp_dir.path().join("cache");
    let run1 = temp_dir.path().join("run1").join("DEM-DRG.tif");
    let run2 = temp_dir.path().join("run2").join("DEM-DRG.tif");
    let mut cache = FeatureCache::new(
        FsStore::with_cache_dir(&cache_dir),
        CountingLoader::default(),
        CountingDetector {
            points: sample_points(),
            ..Default::default()
        },
        CountingMatcher {
            pairs: vec![(0, 0)],
            ..Default::default()
        },
    );

    cache.get_or_detect(&run1).unwrap();
    cache.get_or_detect(&run2).unwrap();
    assert_eq!(cache.detector().calls.get(), 2);
    assert_eq!(std::fs::read_dir(&cache_dir).unwrap().count(), 2);

    let other = temp_dir.path().join("run1").join("other.tif");
    cache.get_or_match(&other, &run1).unwrap();
    cache.get_or_match(&other, &run2).unwrap();
    assert_eq!(cache.matcher().calls.get(), 2);
    assert!(cache.store().exists(&ArtifactKey::matches(&other, &run1)));
    assert!(cache.store().exists(&ArtifactKey::matches(&other, &run2)));

    // Rerunning hits every artifact.
    cache.get_or_detect(&run2).unwrap();
    cache.get_or_match(&other, &run2).unwrap();
    assert_eq!(cache.detector().calls.get(), 3);
    assert_eq!(cache.matcher().calls.get(), 2);
}

#[test]
fn test_fs_store_never_overwrites() {
    let temp_dir = TempDir::new().unwrap();
    let image = temp_dir.path().join("scene.tif");
    let key = ArtifactKey::interest_points(&image);
    let mut store = FsStore::new();

    assert!(!store.exists(&key));
    store.write(&key, b"first").unwrap();
    assert!(store.exists(&key));
    assert!(matches!(
        store.write(&key, b"second"),
        Err(AlignError::WriteFailed { .. })
    ));
    assert_eq!(store.read(&key).unwrap(), b"first");
}

#[test]
fn test_fs_store_creates_cache_dir() {
    let temp_dir = TempDir::new().unwrap();
    let cache_dir = temp_dir.path().join("nested").join("cache");
    let mut store = FsStore::with_cache_dir(&cache_dir);
    let key = ArtifactKey::matches("/x/a.tif", "/y/b.tif");
    store.write(&key, b"{}").unwrap();
    let written = store.path_for(&key);
    assert_eq!(written.parent(), Some(cache_dir.as_path()));
    assert!(written.is_file());
}

#[test]
fn test_missing_image_on_disk_is_unreadable() {
    let temp_dir = TempDir::new().unwrap();
    let image = temp_dir.path().join("missing.png");
    let mut cache = FeatureCache::new(
        FsStore::new(),
        RasterLoader,
        CountingDetector::default(),
        CountingMatcher::default(),
    );
    let err = cache.get_or_detect(&image).unwrap_err();
    assert!(matches!(err, AlignError::SourceUnreadable { .. }));
    assert!(!temp_dir.path().join("missing.ipts").exists());
}

#[test]
fn test_detection_on_disk_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let image_path = temp_dir.path().join("blobs.png");
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let img = blob_image(96, 96, 12, &mut rng);
    let gray = image::GrayImage::from_fn(96, 96, |x, y| {
        image::Luma([(img.get_pixel(x, y)[0] * 255.0).round() as u8])
    });
    gray.save(&image_path).unwrap();

    let mut cache = FeatureCache::new(
        FsStore::new(),
        RasterLoader,
        LogDetector::new(DetectorConfig::default()),
        RatioMatcher::default(),
    );
    let detected = cache.get_or_detect(&image_path).unwrap();
    assert!(!detected.is_empty());
    assert!(temp_dir.path().join("blobs.ipts").is_file());

    let mut reopened = FeatureCache::new(
        FsStore::new(),
        CountingLoader::default(),
        CountingDetector::default(),
        CountingMatcher::default(),
    );
    let cached = reopened.get_or_detect(&image_path).unwrap();
    assert_eq!(cached, detected);
    assert_eq!(reopened.loader().calls.get(), 0);
    assert_eq!(reopened.detector().calls.get(), 0);
}
