use std::f64::consts::PI;
use std::fs;
use std::path::PathBuf;

use assert_approx_eq::assert_approx_eq;
use image::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;

use soil_pore_rust_lib::{
    analyze_pores, compute_descriptors, load_image, load_pore_hierarchy, process_image,
    record_global_stats, AnalysisNotice, AnalysisOptions, BinKey, BinaryImage, Calibration,
    Config, IrregularityClass, PoreError, ShapeCategory, SizeCategory, SizeClass, SizeMetric,
};

const FG: Luma<u8> = Luma([255]);
const BG: Luma<u8> = Luma([0]);

fn blank(width: u32, height: u32) -> GrayImage {
    GrayImage::new(width, height)
}

fn fill(img: &mut GrayImage, x: i32, y: i32, w: u32, h: u32, value: Luma<u8>) {
    draw_filled_rect_mut(img, Rect::at(x, y).of_size(w, h), value);
}

fn binary(img: GrayImage) -> BinaryImage {
    BinaryImage::new(img).unwrap()
}

fn calibration(value: f64) -> Calibration {
    Calibration::new(value).unwrap()
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("soil_pore_it_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

/// 80x20 contour rectangle: area 1600, perimeter 200, shape index just above 0.5
fn rectangle_image() -> GrayImage {
    let mut img = blank(120, 60);
    fill(&mut img, 10, 10, 81, 21, FG);
    img
}

#[test]
fn square_scenario() {
    // 41 pixel span gives a 40x40 contour through pixel centres
    let mut img = blank(100, 100);
    fill(&mut img, 30, 30, 41, 41, FG);
    let analysis = analyze_pores(&binary(img), calibration(1.0), &AnalysisOptions::default());

    assert_eq!(analysis.pores.len(), 1);
    let pore = &analysis.pores[0];
    assert_eq!(pore.id, 0);
    assert!(!pore.is_edge);
    assert_approx_eq!(pore.net_area, 1600.0);
    assert_approx_eq!(pore.net_perimeter, 160.0);

    let d = compute_descriptors(pore, calibration(1.0)).unwrap();
    assert_approx_eq!(d.shape_index, PI / 4.0, 1e-9);
    assert_approx_eq!(d.equivalent_diameter, 45.135, 1e-3);
    assert!(ShapeCategory::from_value(d.shape_index) == Some(ShapeCategory::MLCirc));

    // At 1 px/unit the 50-unit threshold is 1963 px, so the square stays unbinned
    assert_eq!(analysis.area_50, 1963);
    assert_eq!(analysis.summary.num_pores_small, 1);
    assert!(analysis.descriptors[0].is_none());
    assert!(analysis.bins.is_empty());
}

#[test]
fn rectangle_lands_in_rectangle_minor_bin() {
    let analysis = analyze_pores(
        &binary(rectangle_image()),
        calibration(0.25),
        &AnalysisOptions::default(),
    );

    assert_eq!(analysis.area_50, 123);
    assert_eq!(analysis.pores.len(), 1);

    let key = BinKey {
        shape: ShapeCategory::MLCirc,
        size: SizeCategory { metric: SizeMetric::RectMinor, class: SizeClass::S },
    };
    assert_eq!(analysis.bins.len(), 1);
    let rows = &analysis.bins[&key];
    assert_eq!(rows.len(), 1);

    let row = &rows[0];
    assert_approx_eq!(row.size_value, 80.0, 1e-9);
    assert_approx_eq!(row.secondary_size.unwrap(), 320.0, 1e-9);
    assert_eq!(row.irregularity, IrregularityClass::Regular);
    assert!(row.angle.is_none());
}

#[test]
fn digital_circle_is_circular() {
    let mut img = blank(120, 120);
    draw_filled_circle_mut(&mut img, (60, 60), 40, FG);
    let analysis = analyze_pores(&binary(img), calibration(1.0), &AnalysisOptions::default());

    assert_eq!(analysis.pores.len(), 1);
    let d = analysis.descriptors[0].unwrap();
    assert!(d.shape_index > 0.85 && d.shape_index < 1.05, "S = {}", d.shape_index);
    assert!(d.convex_shape_index > 0.85, "C = {}", d.convex_shape_index);
    assert!(d.rect_minor.is_none());

    let minor = d.ellipse_minor.unwrap();
    let major = d.ellipse_major.unwrap();
    assert!((major - minor).abs() < 1.0);
    assert!((75.0..82.0).contains(&minor), "minor = {}", minor);

    let key = BinKey {
        shape: ShapeCategory::Circ,
        size: SizeCategory { metric: SizeMetric::EllipseMinor, class: SizeClass::S },
    };
    assert_eq!(analysis.bins.get(&key).map(Vec::len), Some(1));
}

#[test]
fn analysis_is_idempotent() {
    let mut img = rectangle_image();
    fill(&mut img, 100, 40, 15, 15, FG);
    let image = binary(img);
    let options = AnalysisOptions::default();

    let first = analyze_pores(&image, calibration(0.25), &options);
    let second = analyze_pores(&image, calibration(0.25), &options);
    assert_eq!(first, second);
}

#[test]
fn all_background_reports_no_contours() {
    let analysis = analyze_pores(&binary(blank(64, 64)), calibration(0.3051), &AnalysisOptions::default());

    assert!(analysis.pores.is_empty());
    assert_eq!(analysis.notices, vec![AnalysisNotice::NoContoursFound]);
    assert_eq!(analysis.summary.porosity, 0.0);
    assert_eq!(analysis.summary.pct_area_small, 0.0);
}

#[test]
fn all_foreground_is_one_edge_pore() {
    let mut img = blank(100, 100);
    fill(&mut img, 0, 0, 100, 100, FG);
    let analysis = analyze_pores(&binary(img), calibration(1.0), &AnalysisOptions::default());

    assert_eq!(analysis.pores.len(), 1);
    assert!(analysis.pores[0].is_edge);
    // Contour runs through pixel centres: 99 x 99 out of 100 x 100
    assert_approx_eq!(analysis.summary.porosity, 0.9801, 1e-9);
    assert_approx_eq!(analysis.summary.pct_area_large, 1.0, 1e-9);
}

#[test]
fn inclusions_reduce_net_area() {
    let mut img = blank(100, 100);
    fill(&mut img, 20, 20, 61, 61, FG);
    fill(&mut img, 40, 40, 21, 21, BG);
    let analysis = analyze_pores(&binary(img), calibration(1.0), &AnalysisOptions::default());

    assert_eq!(analysis.pores.len(), 1);
    let pore = &analysis.pores[0];
    assert_eq!(pore.num_inclusions(), 1);
    assert_eq!(analysis.summary.num_inclusions, 1);

    let inclusion = &pore.inclusions[0];
    assert_approx_eq!(pore.net_area, pore.outer.area() - inclusion.area());
    assert_approx_eq!(pore.net_perimeter, pore.outer.perimeter() + inclusion.perimeter());
    assert!(pore.net_area < 3600.0);
}

#[test]
fn edge_and_interior_pores_are_separated() {
    let mut img = blank(100, 100);
    fill(&mut img, 0, 40, 10, 10, FG);
    fill(&mut img, 40, 40, 10, 10, FG);
    let analysis = analyze_pores(&binary(img), calibration(1.0), &AnalysisOptions::default());

    let flags: Vec<bool> = analysis.pores.iter().map(|p| p.is_edge).collect();
    assert_eq!(flags, vec![true, false]);
}

#[test]
fn pores_on_the_left_edge_are_kept() {
    let mut img = blank(100, 100);
    fill(&mut img, 0, 40, 10, 10, FG);
    fill(&mut img, 60, 0, 10, 10, FG);
    fill(&mut img, 40, 70, 10, 10, FG);
    let analysis = analyze_pores(&binary(img), calibration(1.0), &AnalysisOptions::default());

    // Raster order: top-edge pore, left-edge pore, interior pore
    let flags: Vec<bool> = analysis.pores.iter().map(|p| p.is_edge).collect();
    assert_eq!(flags, vec![true, true, false]);
    assert_eq!(analysis.pores[1].outer.bounding_box().min_x, 0);
    assert_approx_eq!(analysis.summary.porosity, 3.0 * 81.0 / 10000.0, 1e-12);
}

#[test]
fn doubling_calibration_halves_equivalent_diameter() {
    let mut img = blank(200, 200);
    fill(&mut img, 40, 40, 121, 121, FG);
    let image = binary(img);
    let options = AnalysisOptions::default();

    let at_one = analyze_pores(&image, calibration(1.0), &options);
    let at_two = analyze_pores(&image, calibration(2.0), &options);

    assert_eq!(at_one.area_50, 1963);
    assert_eq!(at_two.area_50, 7854);

    let ed_one = at_one.descriptors[0].unwrap().equivalent_diameter;
    let ed_two = at_two.descriptors[0].unwrap().equivalent_diameter;
    assert_approx_eq!(ed_two, ed_one / 2.0, 1e-9);
}

#[test]
fn process_image_writes_every_output() {
    let dir = temp_dir("process");
    let input_dir = dir.join("in");
    let output_dir = dir.join("out");
    fs::create_dir_all(&input_dir).unwrap();

    let image_path = input_dir.join("rect.png");
    rectangle_image().save(&image_path).unwrap();

    let config = Config {
        input_path: input_dir.to_string_lossy().into_owned(),
        output_base_dir: output_dir.to_string_lossy().into_owned(),
        pixel_calibration: 0.25,
        ..Config::default()
    };
    config.validate().unwrap();

    let analysis = process_image(load_image(&image_path).unwrap(), &config).unwrap();
    record_global_stats(&config, "rect", &analysis.summary).unwrap();

    let sheet = fs::read_to_string(output_dir.join("rect").join("MLcirc").join("rmsS.csv")).unwrap();
    assert_eq!(sheet.lines().count(), 2);
    assert!(sheet.lines().nth(1).unwrap().starts_with("0,False,1600.000000,200.000000"));

    let hierarchy = load_pore_hierarchy(output_dir.join("rect.json")).unwrap();
    assert_eq!(hierarchy.contours.len(), 1);
    assert_eq!(hierarchy.interior_pores, vec![0]);

    let stats = fs::read_to_string(output_dir.join("global_pore_stats.csv")).unwrap();
    assert_eq!(stats.lines().count(), 2);
    assert!(stats.lines().nth(1).unwrap().starts_with("rect,1,0,"));

    // Existing outputs are kept unless overwriting is enabled
    let rerun = process_image(load_image(&image_path).unwrap(), &config);
    assert!(matches!(rerun, Err(PoreError::OutputExists(_))));

    let config = Config { overwrite_outputs: true, ..config };
    assert!(process_image(load_image(&image_path).unwrap(), &config).is_ok());

    let _ = fs::remove_dir_all(&dir);
}
