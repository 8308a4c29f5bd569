mod common;

use approx::assert_abs_diff_eq;
use common::{calibration_table, init_logging, pattern, scene_tie_points};
use ndarray::Array2;
use sargrid::core::speckle_filter::BoxcarFilter;
use sargrid::{
    boxcar, BoundaryPolicy, BoxcarParams, CalibrationParams, ProcessingParams, ProductMetadata,
    SarBand, SarImage,
};

const POLICIES: [BoundaryPolicy; 3] = [
    BoundaryPolicy::Reflect,
    BoundaryPolicy::Constant,
    BoundaryPolicy::Wrap,
];

fn assert_images_close(a: &Array2<f64>, b: &Array2<f64>) {
    assert_eq!(a.dim(), b.dim());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_abs_diff_eq!(x, y, epsilon = 1e-10);
    }
}

#[test]
fn test_direct_and_separable_agree() {
    init_logging();
    let image = pattern((20, 25));

    for &kernel_size in &[2, 5, 7, 8, 11] {
        for &boundary in &POLICIES {
            let filter = BoxcarFilter::with_params(BoxcarParams {
                kernel_size,
                boundary,
                ..BoxcarParams::default()
            });
            let direct = filter.apply_direct(&image).unwrap();
            let separable = filter.apply_separable(&image).unwrap();
            assert_images_close(&direct, &separable);
        }
    }
}

#[test]
fn test_path_switch_is_seamless() {
    init_logging();
    let image = pattern((30, 30));

    // 7 runs the direct path, 8 the separable one
    for &kernel_size in &[7, 8] {
        let auto = boxcar(&image, kernel_size, BoundaryPolicy::Reflect).unwrap();
        let forced = BoxcarFilter::with_params(BoxcarParams {
            kernel_size,
            separable_threshold: usize::MAX,
            ..BoxcarParams::default()
        })
        .apply_filter(&image)
        .unwrap();
        assert_images_close(&auto, &forced);
    }
}

#[test]
fn test_constant_boundary_on_ones() {
    init_logging();
    let filtered = boxcar(&Array2::ones((10, 10)), 3, BoundaryPolicy::Constant).unwrap();

    assert_eq!(filtered.dim(), (10, 10));
    assert_abs_diff_eq!(filtered[[5, 5]], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(filtered[[0, 0]], 4.0 / 9.0, epsilon = 1e-12);
    assert_abs_diff_eq!(filtered[[0, 5]], 6.0 / 9.0, epsilon = 1e-12);
    assert_abs_diff_eq!(filtered[[9, 9]], 4.0 / 9.0, epsilon = 1e-12);
}

#[test]
fn test_reflect_preserves_constant_image() {
    init_logging();
    let filtered = boxcar(&Array2::from_elem((6, 9), 3.5), 9, BoundaryPolicy::Reflect).unwrap();
    for &v in filtered.iter() {
        assert_abs_diff_eq!(v, 3.5, epsilon = 1e-12);
    }
}

#[test]
fn test_mean_is_preserved_with_wrap() {
    init_logging();
    let image = pattern((16, 12));
    let filtered = boxcar(&image, 5, BoundaryPolicy::Wrap).unwrap();
    assert_abs_diff_eq!(filtered.sum(), image.sum(), epsilon = 1e-9);
}

#[test]
fn test_process_pipeline() {
    init_logging();
    let band = SarBand::new("VV", pattern((101, 201)), scene_tie_points(0.0))
        .with_calibration(calibration_table(100, 200));
    let image = SarImage::new(ProductMetadata::default(), vec![band]).unwrap();

    let boxcar_params = BoxcarParams {
        kernel_size: 5,
        ..BoxcarParams::default()
    };
    let params = ProcessingParams {
        calibration: CalibrationParams::default(),
        boxcar: Some(boxcar_params.clone()),
    };

    let processed = image.process(&params).unwrap();
    let expected = image
        .calibrate(&params.calibration)
        .unwrap()
        .boxcar(&boxcar_params)
        .unwrap();

    assert_eq!(processed.shape(), (101, 201));
    assert_images_close(&processed.bands()[0].data, &expected.bands()[0].data);
}
