//! Decoders reading real files from disk.

use std::io::Write;

use approx::assert_abs_diff_eq;
use vfx_lut::{LutError, read_itx, read_spi1d};

#[test]
fn spi1d_from_disk() {
    let mut file = tempfile::Builder::new().suffix(".spi1d").tempfile().unwrap();
    writeln!(file, "Version 1").unwrap();
    writeln!(file, "From 0.0 2.0").unwrap();
    writeln!(file, "Length 5").unwrap();
    writeln!(file, "Components 1").unwrap();
    writeln!(file, "{{").unwrap();
    for i in 0..5 {
        let x = i as f32 / 4.0;
        writeln!(file, "  {:.6}", x * x).unwrap();
    }
    writeln!(file, "}}").unwrap();
    file.flush().unwrap();

    let spi = read_spi1d(file.path()).unwrap();
    assert_eq!(spi.lut.size(), 5);
    assert_eq!(spi.from_max, 2.0);
    assert_abs_diff_eq!(spi.lut.apply([0.5; 3])[0], 0.25, epsilon = 1e-6);
}

#[test]
fn itx_from_disk_is_reordered() {
    let mut file = tempfile::Builder::new().suffix(".itx").tempfile().unwrap();
    writeln!(file, "LUT_3D_SIZE 2").unwrap();
    // red-fastest, red channel inverted
    for b in 0..2 {
        for g in 0..2 {
            for r in 0..2 {
                writeln!(file, "{} {} {}", 1 - r, g, b).unwrap();
            }
        }
    }
    file.flush().unwrap();

    let lut = read_itx(file.path()).unwrap();
    assert_eq!(lut.get(0, 0, 0), [1.0, 0.0, 0.0]);
    assert_eq!(lut.get(1, 1, 0), [0.0, 1.0, 0.0]);
    assert_eq!(lut.get(0, 0, 1), [1.0, 0.0, 1.0]);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_spi1d(dir.path().join("absent.spi1d")).unwrap_err();
    assert!(matches!(err, LutError::Io(_)));
}
