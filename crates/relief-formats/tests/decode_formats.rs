//! End-to-end decoding through the public entry points.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use relief_formats::{
    decode, decode_owned, decode_with, registry, DecodeError, DecodeOptions, DecodeRequest,
    DecodeWarning, FormatId,
};

/// USGS DEM Record A: name, rows and columns, then free-format values.
fn usgs_dem(name: &str, rows: usize, cols: usize, values: &[i32]) -> Vec<u8> {
    let mut buf = vec![b' '; 1024];
    buf[..name.len()].copy_from_slice(name.as_bytes());
    let rows = format!("{:>6}", rows);
    let cols = format!("{:>6}", cols);
    buf[852..858].copy_from_slice(rows.as_bytes());
    buf[858..864].copy_from_slice(cols.as_bytes());
    for v in values {
        buf.extend_from_slice(format!(" {:>5}", v).as_bytes());
    }
    buf
}

/// DTED with `columns[c][i]` stored south to north.
fn dted(columns: &[Vec<i16>]) -> Vec<u8> {
    let mut buf = vec![b' '; 3428];
    buf[0..3].copy_from_slice(b"UHL");
    buf[4..12].copy_from_slice(b"0100000E");
    buf[12..20].copy_from_slice(b"0200000N");
    buf[20..24].copy_from_slice(b"0300");
    buf[24..28].copy_from_slice(b"0300");
    buf[47..51].copy_from_slice(format!("{:04}", columns.len()).as_bytes());
    buf[51..55].copy_from_slice(format!("{:04}", columns[0].len()).as_bytes());
    buf[80..83].copy_from_slice(b"DSI");
    buf[728..731].copy_from_slice(b"ACC");
    for values in columns {
        buf.extend_from_slice(&[0xAA, 0, 0, 0, 0, 0, 0, 0]);
        for v in values {
            let mut bytes = (v.unsigned_abs() & 0x7FFF).to_be_bytes();
            if *v < 0 {
                bytes[0] |= 0x80;
            }
            buf.extend_from_slice(&bytes);
        }
        buf.extend_from_slice(&[0; 4]);
    }
    buf
}

/// Uncompressed LAS 1.2, point format 0.
fn las(points: &[(i32, i32, i32)]) -> Vec<u8> {
    let mut buf = vec![0u8; 227];
    buf[..4].copy_from_slice(b"LASF");
    buf[24] = 1;
    buf[25] = 2;
    buf[96..100].copy_from_slice(&227u32.to_le_bytes());
    buf[105..107].copy_from_slice(&20u16.to_le_bytes());
    buf[107..111].copy_from_slice(&(points.len() as u32).to_le_bytes());
    for offset in [131, 139, 147] {
        buf[offset..offset + 8].copy_from_slice(&1.0f64.to_le_bytes());
    }
    for (x, y, z) in points {
        let mut record = [0u8; 20];
        record[0..4].copy_from_slice(&x.to_le_bytes());
        record[4..8].copy_from_slice(&y.to_le_bytes());
        record[8..12].copy_from_slice(&z.to_le_bytes());
        buf.extend_from_slice(&record);
    }
    buf
}

#[test]
fn test_every_decoder_fills_width_times_height() {
    let cases: Vec<(&str, Vec<u8>)> = vec![
        ("a.dem", usgs_dem("TEST QUAD", 2, 3, &[1, 2, 3, 4, 5, 6])),
        ("a.dem", usgs_dem("TEST QUAD", 0, 0, &[1, 2, 3, 4, 5])),
        ("a.dt1", dted(&[vec![1, 2, 3], vec![4, 5, 6]])),
        ("a.xyz", b"1 1 10\n2 1 20\n1 2 30\n2 2 40".to_vec()),
        ("a.csv", b"0,0,1\n0,1,2\n0,2,3\n".to_vec()),
        ("a.las", las(&[(0, 0, 1), (10, 0, 2), (0, 5, 3), (7, 3, 4), (2, 9, 5)])),
        ("N10E020.hgt", [0i16, 1, 2, 3].iter().flat_map(|v| v.to_be_bytes()).collect()),
        ("a.asc", b"ncols 2\nnrows 3\ncellsize 1\n1 2 3 4 5 6\n".to_vec()),
    ];

    for (name, buffer) in cases {
        let grid = decode(name, &buffer, None).unwrap_or_else(|e| panic!("{}: {}", name, e));
        assert_eq!(
            grid.elevations().len(),
            grid.width() * grid.height(),
            "{}",
            name
        );
    }
}

#[test]
fn test_usgs_blank_name_is_structural() {
    let buffer = usgs_dem("", 2, 2, &[1, 2, 3, 4]);
    assert!(decode("quad.dem", &buffer, None).unwrap_err().is_structural());
}

#[test]
fn test_usgs_fallback_is_reported() {
    let report = decode_with(
        "quad.dem",
        &usgs_dem("TEST", 0, 0, &[1, 2, 3, 4, 5]),
        None,
        &DecodeOptions::default(),
    )
    .unwrap();
    assert_eq!(report.format, FormatId::UsgsDem);
    assert!(matches!(
        report.warnings.as_slice(),
        [DecodeWarning::DimensionFallback { values: 5, width: 3, height: 2 }]
    ));
}

#[test]
fn test_dted_rejects_missing_uhl_and_flips_rows() {
    let mut buffer = dted(&[vec![-100, 50]]);
    let grid = decode("n20e010.dt2", &buffer, None).unwrap();
    assert_eq!(grid.elevations(), &[50.0, -100.0]);

    buffer[..3].copy_from_slice(b"HDR");
    assert!(decode("n20e010.dt2", &buffer, None).unwrap_err().is_structural());
}

#[test]
fn test_xyz_corners_follow_coordinates() {
    let grid = decode("pts.xyz", b"1 1 10\n2 1 20\n1 2 30\n2 2 40", None).unwrap();
    assert_eq!((grid.width(), grid.height()), (2, 2));
    assert_eq!(grid.get(0, 0), Some(30.0));
    assert_eq!(grid.get(1, 0), Some(40.0));
    assert_eq!(grid.get(0, 1), Some(10.0));
    assert_eq!(grid.get(1, 1), Some(20.0));
}

#[test]
fn test_las_random_clouds_have_no_holes() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..10 {
        let n = rng.gen_range(1..500);
        let points: Vec<(i32, i32, i32)> = (0..n)
            .map(|_| {
                (
                    rng.gen_range(0..10_000),
                    rng.gen_range(0..300),
                    rng.gen_range(-100..2_000),
                )
            })
            .collect();
        let grid = decode("cloud.las", &las(&points), None).unwrap();
        assert!(grid.elevations().iter().all(|v| v.is_finite()));
    }
}

#[test]
fn test_las_cap_samples_whole_file() {
    let points: Vec<(i32, i32, i32)> = (0..1_000).map(|i| (i, i, i)).collect();
    let options = DecodeOptions::default().with_max_points(40);
    let report = decode_with("cloud.las", &las(&points), None, &options).unwrap();

    assert_eq!(
        report.warnings,
        vec![DecodeWarning::PointsSubsampled {
            total: 1_000,
            stride: 25
        }]
    );
    // Extent reaches the last stride-sampled point, not the first 40.
    let (_, _, max_x, _) = report.grid.bounds();
    assert!(max_x > 900.0, "max_x = {}", max_x);
}

#[test]
fn test_unsupported_formats_carry_guidance() {
    for descriptor in registry::descriptors().iter().filter(|d| !d.supported) {
        for ext in descriptor.extensions {
            let name = format!("input{}", ext);
            match decode(&name, b"\0\0\0\0", None) {
                Err(DecodeError::UnsupportedFormat { guidance, .. }) => assert!(!guidance.is_empty()),
                other => panic!("{} was routed: {:?}", name, other),
            }
        }
    }
}

#[test]
fn test_copc_routes_to_las() {
    let descriptor = registry::classify("tile.copc.laz").unwrap();
    assert_eq!(descriptor.id, FormatId::LasLaz);
}

#[test]
fn test_owned_requests_decode_on_worker_threads() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let request = DecodeRequest {
                filename: format!("pts{}.xyz", i),
                buffer: format!("0 0 {i}\n1 0 {i}\n0 1 {i}\n1 1 {i}\n").into_bytes(),
                companion: None,
            };
            std::thread::spawn(move || decode_owned(request, &DecodeOptions::default()))
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let report = handle.join().unwrap().unwrap();
        assert!(report.grid.elevations().iter().all(|v| *v == i as f32));
    }
}
