mod common;

use approx::assert_abs_diff_eq;
use common::{calibration_table, init_logging, pattern, scene_latitude, scene_longitude, scene_tie_points};
use sargrid::{CalibrationParams, ProductMetadata, SarBand, SarError, SarImage, Window};

fn scene() -> SarImage {
    let band = SarBand::new("VV", pattern((101, 201)), scene_tie_points(0.0))
        .with_calibration(calibration_table(100, 200));
    SarImage::new(ProductMetadata::default(), vec![band]).unwrap()
}

#[test]
fn test_window_moves_geolocation_into_local_frame() {
    init_logging();
    let image = scene();
    let window = image.window(&Window::new(10..20, 5..15)).unwrap();

    assert_eq!(window.shape(), (10, 10));
    assert_eq!(window.pixel(0, 0), image.pixel(10, 5));

    let (lat, long) = window.coordinate_of(5.0, 5.0).unwrap();
    assert_abs_diff_eq!(lat, scene_latitude(15.0, 10.0), epsilon = 1e-9);
    assert_abs_diff_eq!(long, scene_longitude(15.0, 10.0), epsilon = 1e-9);

    let (lat, long) = image.coordinate_of(15.0, 10.0).unwrap();
    assert_eq!(window.index_of(lat, long).unwrap(), (5, 5));
}

#[test]
fn test_window_keeps_tie_points_outside_its_extent() {
    init_logging();
    let window = scene().window(&Window::new(10..20, 5..15)).unwrap();
    let points = window.bands()[0].geo.points();

    // Every tie point survives; most now lie outside the 10 x 10 window
    assert_eq!(points.len(), 25);
    assert_abs_diff_eq!(points.row().iter().cloned().fold(f64::INFINITY, f64::min), -10.0);
    assert_abs_diff_eq!(points.column().iter().cloned().fold(f64::NEG_INFINITY, f64::max), 195.0);
}

#[test]
fn test_strided_window() {
    init_logging();
    let image = scene();
    let window = image.window(&"10:30:2, 5:15".parse().unwrap()).unwrap();

    assert_eq!(window.shape(), (10, 10));
    assert_eq!(window.pixel(2, 5), image.pixel(14, 10));

    let (lat, long) = window.coordinate_of(2.0, 5.0).unwrap();
    assert_abs_diff_eq!(lat, scene_latitude(14.0, 10.0), epsilon = 1e-9);
    assert_abs_diff_eq!(long, scene_longitude(14.0, 10.0), epsilon = 1e-9);
}

#[test]
fn test_window_footprint_from_corners() {
    init_logging();
    let window = scene().window(&Window::new(10..20, 5..15)).unwrap();
    let footprint = window.metadata().footprint.unwrap();

    let corners = [(10.0, 5.0), (10.0, 15.0), (20.0, 5.0), (20.0, 15.0)];
    for (k, &(row, column)) in corners.iter().enumerate() {
        assert_abs_diff_eq!(footprint.latitude[k], scene_latitude(row, column), epsilon = 1e-9);
        assert_abs_diff_eq!(footprint.longitude[k], scene_longitude(row, column), epsilon = 1e-9);
    }
}

#[test]
fn test_windowed_calibration_matches_full_calibration() {
    init_logging();
    let image = scene();
    let params = CalibrationParams {
        tiles: 3,
        ..CalibrationParams::default()
    };

    let full = image.calibrate(&params).unwrap();
    let window = image
        .window(&"10:50:3, 7:100:2".parse().unwrap())
        .unwrap()
        .calibrate(&params)
        .unwrap();

    let expected = full.bands()[0]
        .data
        .slice(ndarray::s![10..50;3, 7..100;2])
        .to_owned();
    let actual = &window.bands()[0].data;
    assert_eq!(actual.dim(), expected.dim());
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(a, e, epsilon = 1e-9 * e.abs().max(1.0));
    }
}

#[test]
fn test_invalid_windows() {
    init_logging();
    let image = scene();

    assert!(matches!("5, 5".parse::<Window>(), Err(SarError::InvalidWindow(_))));
    assert!(matches!(
        image.window(&Window::new(150.., ..)),
        Err(SarError::InvalidWindow(_))
    ));
    assert!(matches!(
        image.window(&"0:10:0, :".parse().unwrap()),
        Err(SarError::InvalidWindow(_))
    ));
}
