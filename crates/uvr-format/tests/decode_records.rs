//! Decoding tests over synthetic records.
//!
//! These tests don't require archive data; records are generated by
//! `test-utils` byte for byte.

use test_utils::{
    assert_approx_eq, codes, i16_record, product_filename, ramp_samples, u8_record, RecordSpec,
};
use uvr_format::{
    decode, decode_named, parse_filename, DecodeError, NameError, ProductMetadata,
    SampleEncoding, Variable,
};

fn meta_for(spec: &RecordSpec, variable: &str, encoding: &str) -> ProductMetadata {
    let name = product_filename("MOD", "20191105", "Av1", spec.pixels, spec.lines, variable, encoding);
    parse_filename(&name).expect("valid name")
}

// ============================================================================
// Filename codec
// ============================================================================

#[test]
fn test_filename_round_trip_all_codes() {
    for inst in codes::INSTRUMENTS {
        for avg in codes::AVERAGES {
            for var in codes::VARIABLES {
                for enc in codes::ENCODINGS {
                    let name = product_filename(inst, "20200229", avg, 7200, 3601, var, enc);
                    let meta = parse_filename(&name).unwrap();
                    assert_eq!(meta.instrument.code(), inst);
                    assert_eq!(meta.average.code(), avg);
                    assert_eq!(meta.variable.code(), var);
                    assert_eq!(meta.encoding.code(), enc);

                    let rebuilt = product_filename(
                        meta.instrument.code(),
                        &meta.start_date.format("%Y%m%d").to_string(),
                        meta.average.code(),
                        meta.pixel_count,
                        meta.line_count,
                        meta.variable.code(),
                        meta.encoding.code(),
                    );
                    assert_eq!(parse_filename(&rebuilt).unwrap(), meta);
                }
            }
        }
    }
}

#[test]
fn test_any_other_length_is_malformed() {
    let name = product_filename("MOD", "20191105", "Av1", 7200, 3601, "uvb", "le");
    for len in [0, 1, 10, 43] {
        assert!(matches!(
            parse_filename(&name[..len]),
            Err(NameError::MalformedName { .. })
        ));
    }
    for extra in ["x", ".gz", "_______"] {
        assert!(matches!(
            parse_filename(&format!("{name}{extra}")),
            Err(NameError::MalformedName { .. })
        ));
    }
}

// ============================================================================
// Calibration and masking
// ============================================================================

#[test]
fn test_slope_and_offset_applied() {
    let spec = RecordSpec {
        slope: 0.1,
        offset: 2.0,
        ..RecordSpec::with_size(64, 2)
    };
    let samples = vec![50i16; 64 * 2];
    let grid = decode(&meta_for(&spec, "uvb", "le"), &i16_record(&spec, &samples)).unwrap();

    assert_approx_eq!(grid.value(0, 0, 0).unwrap(), 7.0, 1e-9);
    assert_approx_eq!(grid.value(0, 1, 63).unwrap(), 7.0, 1e-9);
    assert_eq!(grid.encoding.scale_factor, 0.1);
    assert_eq!(grid.encoding.add_offset, 2.0);
}

#[test]
fn test_fill_value_always_masked_i16() {
    for (slope, offset) in [(0.1, 2.0), (0.0, 0.0), (-3.0, 1e6)] {
        let spec = RecordSpec {
            slope,
            offset,
            ..RecordSpec::with_size(64, 2)
        };
        let mut samples = vec![7i16; 64 * 2];
        samples[3] = -1;
        samples[64 + 10] = -1;
        let grid = decode(&meta_for(&spec, "uva", "le"), &i16_record(&spec, &samples)).unwrap();

        // On-disk row 0 becomes decoded row 1.
        assert_eq!(grid.value(0, 1, 3), None);
        assert_eq!(grid.value(0, 0, 10), None);
        assert!(grid.value(0, 0, 3).is_some());
        let stats = grid.statistics();
        assert_eq!(stats.masked, 2);
        assert_eq!(stats.valid, 126);
    }
}

#[test]
fn test_fill_value_always_masked_u8() {
    let spec = RecordSpec::with_size(64, 3);
    let mut samples = vec![10u8; 64 * 3];
    samples[0] = 255;
    let grid = decode(&meta_for(&spec, "par", "8b"), &u8_record(&spec, &samples)).unwrap();

    assert_eq!(grid.encoding.sample, SampleEncoding::U8);
    assert_eq!(grid.value(0, 2, 0), None);
    assert_approx_eq!(grid.value(0, 0, 0).unwrap(), 2.0 + 0.1 * 10.0, 1e-9);
    // -1 is an ordinary value only for signed samples; 0 is valid for u8.
    assert_eq!(grid.statistics().masked, 1);
}

#[test]
fn test_masked_cells_excluded_from_mean() {
    let spec = RecordSpec {
        slope: 1.0,
        offset: 0.0,
        ..RecordSpec::with_size(64, 1)
    };
    let mut samples = vec![-1i16; 64];
    samples[0] = 10;
    samples[1] = 30;
    let grid = decode(&meta_for(&spec, "uvb", "le"), &i16_record(&spec, &samples)).unwrap();
    assert_eq!(grid.statistics().mean, Some(20.0));
}

// ============================================================================
// Coordinates and orientation
// ============================================================================

#[test]
fn test_axes_monotone_with_constant_step() {
    let spec = RecordSpec {
        lon_min: -180.0,
        lat_max: 90.0,
        resolution: 0.25,
        ..RecordSpec::with_size(64, 8)
    };
    let grid = decode(
        &meta_for(&spec, "uvb", "le"),
        &i16_record(&spec, &ramp_samples(64, 8)),
    )
    .unwrap();

    assert_eq!(grid.lat.len(), 8);
    assert_eq!(grid.lon.len(), 64);
    assert_eq!(grid.lat[0], 90.0);
    assert_eq!(grid.lon[0], -180.0);
    for w in grid.lat.windows(2) {
        assert!(w[1] < w[0]);
        assert_approx_eq!(w[0] - w[1], 0.25, 1e-9);
    }
    for w in grid.lon.windows(2) {
        assert!(w[1] > w[0]);
        assert_approx_eq!(w[1] - w[0], 0.25, 1e-9);
    }
}

#[test]
fn test_vertical_flip() {
    let spec = RecordSpec {
        slope: 1.0,
        offset: 0.0,
        ..RecordSpec::with_size(64, 5)
    };
    let grid = decode(
        &meta_for(&spec, "uvb", "le"),
        &i16_record(&spec, &ramp_samples(64, 5)),
    )
    .unwrap();

    // ramp sample = on-disk row * 100 + col
    for row in 0..5 {
        let disk_row = 4 - row;
        assert_eq!(grid.raw(0, row, 0), (disk_row * 100) as i32);
        assert_eq!(grid.raw(0, row, 7), (disk_row * 100 + 7) as i32);
    }
}

#[test]
fn test_metadata_attached() {
    let spec = RecordSpec::default();
    let grid = decode(
        &meta_for(&spec, "uvb", "le"),
        &i16_record(&spec, &ramp_samples(spec.pixels, spec.lines)),
    )
    .unwrap();

    assert_eq!(grid.variable, Variable::Uvb);
    assert_eq!(grid.description(), "UVB");
    assert_eq!(grid.unit(), "W/m^2");
    assert_eq!(grid.shape(), [1, spec.lines, spec.pixels]);
    assert_eq!(grid.times[0].to_string(), "2019-11-05");
    assert_eq!(grid.parameter.as_deref(), Some("UVB"));
    assert_eq!(grid.source_name.as_deref(), Some("uvb_daily.dat"));
    assert_eq!(grid.encoding.fill_value(), -1);
    assert_eq!(grid.encoding.width(), 2);
}

// ============================================================================
// Corrupt input
// ============================================================================

#[test]
fn test_inconsistent_dimensions() {
    let spec = RecordSpec::with_size(64, 4);
    let record = i16_record(&spec, &ramp_samples(64, 4));
    let mismatched = RecordSpec::with_size(64, 5);
    let err = decode(&meta_for(&mismatched, "uvb", "le"), &record).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::InconsistentDimensions {
            header_lines: 4,
            name_lines: 5,
            ..
        }
    ));
}

#[test]
fn test_truncated_body() {
    let spec = RecordSpec::with_size(64, 4);
    let mut record = i16_record(&spec, &ramp_samples(64, 4));
    record.pop();
    let err = decode(&meta_for(&spec, "uvb", "le"), &record).unwrap_err();
    assert_eq!(
        err,
        DecodeError::TruncatedBody {
            expected: 64 * 4 * 2,
            actual: 64 * 4 * 2 - 1
        }
    );

    record.extend_from_slice(&[0, 0, 0]);
    assert!(matches!(
        decode(&meta_for(&spec, "uvb", "le"), &record),
        Err(DecodeError::TruncatedBody { .. })
    ));
}

#[test]
fn test_corrupt_header() {
    let spec = RecordSpec::with_size(64, 4);
    let mut record = i16_record(&spec, &ramp_samples(64, 4));
    record[12..20].copy_from_slice(b"garbage!");
    let err = decode(&meta_for(&spec, "uvb", "le"), &record).unwrap_err();
    assert!(matches!(err, DecodeError::CorruptHeader { field: "lon_min", .. }));
}

#[test]
fn test_record_shorter_than_header() {
    let spec = RecordSpec::with_size(64, 4);
    let err = decode(&meta_for(&spec, "uvb", "le"), &[b' '; 20]).unwrap_err();
    assert!(matches!(err, DecodeError::CorruptHeader { field: "header", .. }));
}

#[test]
fn test_decode_named_reports_bad_name() {
    let err = decode_named("short.dat", &[]).unwrap_err();
    assert!(matches!(err, DecodeError::Name(NameError::MalformedName { .. })));
}
