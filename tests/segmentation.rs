use image::{ImageFormat, Rgb, RgbImage};
use material_segmenter_wasm::{
    KMeansParams, PanelOptions, PixelGrid, SegmentConfig, SegmentError, Segmenter, extract_features, kmeans,
    segment_bytes,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::io::Cursor;

fn seeded(seed: u64) -> Segmenter {
    Segmenter::new(SegmentConfig {
        seed: Some(seed),
        ..Default::default()
    })
    .unwrap()
}

fn noisy_grid(width: usize, height: usize, seed: u64) -> PixelGrid {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let pixels = (0..width * height)
        .map(|_| [rng.random(), rng.random(), rng.random()])
        .collect();
    PixelGrid::from_pixels(width, height, pixels).unwrap()
}

#[test]
fn dark_top_bright_bottom_splits_in_half() {
    let grid = PixelGrid::from_rows(&[
        vec![[0, 0, 0], [0, 0, 0]],
        vec![[255, 255, 255], [255, 255, 255]],
    ])
    .unwrap();

    for seed in 0..8 {
        let segmenter = Segmenter::new(SegmentConfig {
            attempts: 1,
            seed: Some(seed),
            ..Default::default()
        })
        .unwrap();
        let result = segmenter.segment(&grid).unwrap();

        assert_eq!(
            result.mask.to_rows(),
            vec![vec![false, false], vec![true, true]]
        );
        assert_eq!(result.material_centroid(), [255.0; 3]);
        assert_eq!(result.stats.material_pct, 50.0);
        assert_eq!(result.stats.background_pct, 50.0);
    }
}

#[test]
fn uniform_image_is_all_one_region() {
    let grid = PixelGrid::from_pixels(3, 3, vec![[87, 120, 64]; 9]).unwrap();
    let result = seeded(5).segment(&grid).unwrap();

    let pct = result.stats.material_pct;
    assert!(pct == 100.0 || pct == 0.0, "got {pct}");
    assert_eq!(result.stats.material_count + result.stats.background_count, 9);
}

#[test]
fn cluster_count_out_of_range() {
    let grid = noisy_grid(2, 2, 0);
    let features = extract_features(&grid).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(0);

    for k in [0, 5] {
        let params = KMeansParams {
            k,
            ..Default::default()
        };
        assert!(matches!(
            kmeans(&features, &params, &mut rng),
            Err(SegmentError::InvalidParameter { .. })
        ));
    }

    let err = seeded(0)
        .segment(&PixelGrid::from_pixels(1, 1, vec![[3, 3, 3]]).unwrap())
        .unwrap_err();
    assert!(matches!(err, SegmentError::InvalidParameter { name: "k", .. }));
}

#[test]
fn empty_grid_is_invalid_input() {
    let grid = PixelGrid::from_pixels(0, 0, Vec::new()).unwrap();
    assert!(matches!(
        seeded(0).segment(&grid),
        Err(SegmentError::InvalidInput(_))
    ));
}

#[test]
fn random_images_keep_the_invariants() {
    for (i, (w, h)) in [(1, 2), (5, 3), (16, 9), (31, 17)].into_iter().enumerate() {
        let grid = noisy_grid(w, h, i as u64);
        let result = seeded(i as u64).segment(&grid).unwrap();

        assert_eq!(result.clustering.assignment.len(), w * h);
        assert!(result.clustering.assignment.iter().all(|&c| c < 2));
        assert_eq!((result.mask.width(), result.mask.height()), (w, h));
        assert_eq!(
            result.stats.material_count + result.stats.background_count,
            w * h
        );
        assert!((result.stats.material_pct + result.stats.background_pct - 100.0).abs() < 1e-6);
        assert!((0.0..=100.0).contains(&result.stats.material_pct));

        for (idx, &c) in result.clustering.assignment.iter().enumerate() {
            let expected = c == result.labels.material;
            assert_eq!(result.mask.get(idx / w, idx % w), Some(expected));
        }
    }
}

#[test]
fn custom_rng_is_honoured() {
    let grid = noisy_grid(12, 12, 77);
    let segmenter = Segmenter::default();
    let a = segmenter
        .segment_with_rng(&grid, &mut ChaCha8Rng::seed_from_u64(10))
        .unwrap();
    let b = segmenter
        .segment_with_rng(&grid, &mut ChaCha8Rng::seed_from_u64(10))
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn segment_bytes_end_to_end() {
    let mut img = RgbImage::from_pixel(10, 4, Rgb([15, 20, 25]));
    for x in 0..10 {
        img.put_pixel(x, 0, Rgb([230, 225, 210]));
    }
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();

    let config = SegmentConfig {
        seed: Some(2),
        ..Default::default()
    };
    let report = segment_bytes(&png, &config, &PanelOptions::default()).unwrap();

    assert_eq!((report.width, report.height), (10, 4));
    assert_eq!(report.stats.material_count, 10);
    assert_eq!(report.stats.material_pct, 25.0);
    assert_eq!(report.material_centroid, [230.0, 225.0, 210.0]);
    assert_eq!(report.mask.len(), 40);
    assert!(report.mask[..10].iter().all(|&m| m == 255));
    assert!(report.mask[10..].iter().all(|&m| m == 0));

    let panels = image::load_from_memory(&report.panels_png).unwrap();
    assert_eq!((panels.width(), panels.height()), (30, 4));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["stats"]["material_pct"], 25.0);
    assert!(json.get("mask").is_none());
}

#[test]
fn refine_flag_from_json_narrows_material() {
    let (dark, mid, bright) = (Rgb([20, 20, 20]), Rgb([180, 180, 180]), Rgb([250, 250, 250]));
    let mut img = RgbImage::from_pixel(6, 2, dark);
    for x in 0..6 {
        img.put_pixel(x, 1, if x < 3 { mid } else { bright });
    }
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();

    let plain = SegmentConfig::from_json_str(r#"{"seed": 8}"#).unwrap();
    let refined = SegmentConfig::from_json_str(r#"{"seed": 8, "refine": true}"#).unwrap();
    let panel = PanelOptions::default();

    assert_eq!(segment_bytes(&png, &plain, &panel).unwrap().stats.material_pct, 50.0);
    let report = segment_bytes(&png, &refined, &panel).unwrap();
    assert_eq!(report.stats.material_pct, 25.0);
    assert_eq!(report.material_centroid, [250.0; 3]);
    assert_eq!(&report.mask[6..], &[0, 0, 0, 255, 255, 255]);
}

#[test]
fn segment_bytes_rejects_garbage() {
    assert!(matches!(
        segment_bytes(b"nope", &SegmentConfig::default(), &PanelOptions::default()),
        Err(SegmentError::ImageLoad(_))
    ));
}
