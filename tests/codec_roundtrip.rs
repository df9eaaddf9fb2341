use proptest::prelude::*;
use secram::codec::{CodecError, ColumnConfig, RecordCodec, ValueCodec};
use secram::pileup::{FeatureCode, PositionFeature, ReadHeader};
use secram::{Ciphertext, PositionRecord};

fn base() -> impl Strategy<Value = u8> {
    prop_oneof![Just(b'A'), Just(b'C'), Just(b'G'), Just(b'T'), Just(b'N')]
}

fn feature() -> impl Strategy<Value = PositionFeature> {
    (0u32..64, 0u8..13, 1u32..12)
        .prop_flat_map(|(coverage_index, code, length)| {
            let code = FeatureCode::from_code(code).expect("code below 13");
            let length = if code.operation().consumes_reference() { 1 } else { length };
            let bases = if code.carries_bases() { length as usize } else { 0 };
            proptest::collection::vec(base(), bases).prop_map(move |bases| {
                PositionFeature::new(coverage_index, code, length, bases)
            })
        })
}

fn header() -> impl Strategy<Value = ReadHeader> {
    (0u32..64, any::<u8>(), any::<bool>(), 1u32..100_000).prop_map(
        |(coverage_index, mapping_quality, is_reverse, reference_span)| ReadHeader {
            coverage_index,
            mapping_quality,
            is_reverse,
            reference_span,
        },
    )
}

fn record() -> impl Strategy<Value = PositionRecord<Ciphertext>> {
    (
        0u128..(1u128 << 96),
        base(),
        0u32..1000,
        proptest::collection::vec(header(), 0..4),
        proptest::collection::vec(feature(), 0..8),
        proptest::collection::vec(any::<u8>(), 0..40),
    )
        .prop_map(
            |(position, reference_base, coverage, read_headers, features, quality_scores)| {
                PositionRecord {
                    position: Ciphertext::from_raw(position),
                    reference_base,
                    coverage,
                    read_headers,
                    features,
                    quality_scores,
                }
            },
        )
}

proptest! {
    #[test]
    fn records_survive_encoding(record in record()) {
        let codec = RecordCodec::default();
        let encoded = codec.encode(&record).unwrap();
        prop_assert_eq!(encoded.bit_len, codec.bit_len(&record).unwrap());
        prop_assert_eq!(codec.decode(&encoded.bytes, encoded.bit_len).unwrap(), record);
    }
}

#[test]
fn zero_feature_record_is_compact() {
    let record = PositionRecord {
        position: Ciphertext::from_raw(12345),
        reference_base: b'A',
        coverage: 0,
        read_headers: Vec::new(),
        features: Vec::new(),
        quality_scores: Vec::new(),
    };
    let codec = RecordCodec::default();
    let encoded = codec.encode(&record).unwrap();
    // position, base, coverage and three counts
    assert_eq!(encoded.bit_len, 96 + 4 + 24 + 16 + 24 + 32);
    assert_eq!(codec.decode(&encoded.bytes, encoded.bit_len).unwrap(), record);
}

#[test]
fn value_outside_column_is_reported() {
    let codec = RecordCodec::new(ColumnConfig {
        coverage: ValueCodec::beta_covering(0, 3),
        ..ColumnConfig::default()
    });
    let record = PositionRecord {
        position: Ciphertext::from_raw(1),
        reference_base: b'C',
        coverage: 4,
        read_headers: Vec::new(),
        features: Vec::new(),
        quality_scores: Vec::new(),
    };
    assert!(matches!(
        codec.encode(&record),
        Err(CodecError::ValueOutOfRange { value: 4, bits: 2 })
    ));
}

fn narrow_columns() -> ColumnConfig {
    ColumnConfig {
        coverage: ValueCodec::beta_covering(0, 63),
        header_count: ValueCodec::beta_covering(0, 15),
        feature_count: ValueCodec::beta_covering(0, 15),
        coverage_index: ValueCodec::beta_covering(0, 15),
        feature_length: ValueCodec::beta_covering(0, 15),
        quality_count: ValueCodec::beta_covering(0, 255),
        ..ColumnConfig::default()
    }
}

/// Every count and value sits at the top of its narrow column.
fn saturated_record() -> PositionRecord<Ciphertext> {
    let mut features = vec![PositionFeature::new(0, FeatureCode::Insertion, 15, vec![b'G'; 15])];
    features.extend((1..15).map(|idx| {
        if idx % 2 == 0 {
            PositionFeature::new(idx, FeatureCode::Deletion, 1, Vec::new())
        } else {
            PositionFeature::new(idx, FeatureCode::Substitution, 1, b"T".to_vec())
        }
    }));
    PositionRecord {
        position: Ciphertext::from_raw((1u128 << 96) - 1),
        reference_base: b'N',
        coverage: 63,
        read_headers: (0..15)
            .map(|idx| ReadHeader {
                coverage_index: idx,
                mapping_quality: u8::MAX,
                is_reverse: idx % 2 == 1,
                reference_span: u32::MAX,
            })
            .collect(),
        features,
        quality_scores: vec![u8::MAX; 255],
    }
}

#[test]
fn records_at_column_limits_round_trip() {
    let codec = RecordCodec::new(narrow_columns());
    let record = saturated_record();
    assert_eq!(record.features.len(), 15);
    let encoded = codec.encode(&record).unwrap();
    assert_eq!(encoded.bit_len, codec.bit_len(&record).unwrap());
    assert_eq!(codec.decode(&encoded.bytes, encoded.bit_len).unwrap(), record);
}

#[test]
fn one_past_each_column_limit_is_out_of_range() {
    let codec = RecordCodec::new(narrow_columns());

    let mut record = saturated_record();
    record
        .features
        .push(PositionFeature::new(3, FeatureCode::Deletion, 1, Vec::new()));
    assert!(matches!(
        codec.encode(&record),
        Err(CodecError::ValueOutOfRange { value: 16, bits: 4 })
    ));

    let mut record = saturated_record();
    record.coverage = 64;
    assert!(matches!(
        codec.encode(&record),
        Err(CodecError::ValueOutOfRange { value: 64, bits: 6 })
    ));

    let mut record = saturated_record();
    record.features[0] = PositionFeature::new(0, FeatureCode::Insertion, 16, vec![b'G'; 16]);
    assert!(matches!(
        codec.encode(&record),
        Err(CodecError::ValueOutOfRange { value: 16, bits: 4 })
    ));

    let mut record = saturated_record();
    record.features[1].coverage_index = 16;
    assert!(matches!(
        codec.encode(&record),
        Err(CodecError::ValueOutOfRange { value: 16, bits: 4 })
    ));

    let mut record = saturated_record();
    record.quality_scores.push(0);
    assert!(matches!(
        codec.encode(&record),
        Err(CodecError::ValueOutOfRange { value: 256, bits: 8 })
    ));
}
