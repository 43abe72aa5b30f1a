use approx::assert_abs_diff_eq;
use silbido_tonal::{write_time_frequency_file, FeatureMask, TonalReader};

fn sample_contours() -> Vec<Vec<(f64, f64)>> {
    vec![
        vec![(0.101, 5012.5), (0.103, 5100.25), (0.107, 5300.125)],
        vec![(1.0 / 3.0, 12_000.0 / 7.0)],
        vec![(2.5, 20_000.0), (2.75, 19_876.543_21)],
    ]
}

#[test]
fn test_time_frequency_roundtrip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contours.bin");
    let contours = sample_contours();

    write_time_frequency_file(&path, &contours).unwrap();

    let mut reader = TonalReader::open(&path).unwrap();
    assert!(!reader.header().is_headerless());
    assert_eq!(reader.header().mask, FeatureMask::DEFAULT);

    let decoded = reader.time_frequency_contours().unwrap();
    assert_eq!(decoded.len(), contours.len());

    for (got, want) in decoded.iter().zip(&contours) {
        assert_eq!(got.len(), want.len());
        for (&(t1, f1), &(t2, f2)) in got.iter().zip(want) {
            assert_abs_diff_eq!(t1, t2, epsilon = 1e-9);
            assert_abs_diff_eq!(f1, f2, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_rewind_matches_fresh_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contours.bin");
    write_time_frequency_file(&path, &sample_contours()).unwrap();

    let mut reader = TonalReader::open(&path).unwrap();
    reader.next_tonal().unwrap();
    reader.next_tonal().unwrap();
    reader.rewind().unwrap();
    let rewound: Vec<_> = reader.collect::<Result<_, _>>().unwrap();

    let fresh: Vec<_> = TonalReader::open(&path)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(rewound, fresh);
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = TonalReader::open(&dir.path().join("missing.bin")).err().unwrap();
    assert!(err.to_string().contains("missing.bin"));
}
