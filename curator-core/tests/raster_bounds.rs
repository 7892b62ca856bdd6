use curator_core::{BoundaryPoint, Error, RasterShape, Region, RegionRegistry};

fn triangle_at(row: f64, col: f64) -> Vec<BoundaryPoint> {
    vec![
        BoundaryPoint::new(0.0, 0.0),
        BoundaryPoint::new(1.0, 1.0),
        BoundaryPoint::new(row, col),
    ]
}

fn single(shape: RasterShape, row: f64, col: f64) -> RegionRegistry {
    let region = Region::new(triangle_at(row, col), vec![0.0; 2], 1.0);
    RegionRegistry::new(shape, vec![region]).unwrap()
}

#[test]
fn test_last_pixel_is_inside() {
    let shape = RasterShape::new(16, 12);
    let registry = single(shape, 15.0, 11.0);
    let image = registry
        .rasterize(&[0], RegionRegistry::label_of)
        .unwrap();
    assert_eq!(image[[15, 11]], 1);
    assert!(registry.validate().is_ok());
}

#[test]
fn test_row_at_height_is_out_of_bounds() {
    let shape = RasterShape::new(16, 12);
    let registry = single(shape, 16.0, 3.0);
    let err = registry
        .rasterize(&[0], RegionRegistry::label_of)
        .unwrap_err();
    assert!(
        matches!(err, Error::OutOfBounds { region: 0, height: 16, width: 12, .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(registry.validate(), Err(err));
}

#[test]
fn test_col_rounding_past_width_is_out_of_bounds() {
    // 11.6 lies inside [0, 12) but rounds onto column 12.
    let registry = single(RasterShape::new(16, 12), 2.0, 11.6);
    assert!(matches!(
        registry.rasterize_scalar(&[0], |_| 1.0),
        Err(Error::OutOfBounds { .. })
    ));
}

#[test]
fn test_rasterize_is_idempotent() {
    let regions = (0..20)
        .map(|i| {
            let offset = f64::from(i) * 1.5;
            Region::new(
                vec![
                    BoundaryPoint::new(offset, offset),
                    BoundaryPoint::new(offset, offset + 4.0),
                    BoundaryPoint::new(offset + 4.0, offset + 2.0),
                ],
                vec![0.0; 3],
                f64::from(i),
            )
        })
        .collect();
    let registry = RegionRegistry::new(RasterShape::new(40, 40), regions).unwrap();
    let ids: Vec<usize> = (0..registry.len()).rev().collect();

    let first = registry.rasterize(&ids, RegionRegistry::label_of).unwrap();
    let second = registry.rasterize(&ids, RegionRegistry::label_of).unwrap();
    assert_eq!(first, second);
}
