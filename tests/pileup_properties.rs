//! Pileup assembly properties
//!
//! Feature placement, coverage accounting and the low-water-mark flush.

mod common;

use common::{matching_read, read, reference, sequence};
use proptest::prelude::*;
use secram::genomics::AbsolutePosition;
use secram::pileup::{FeatureCode, PositionRecordAssembler};
use secram::{AlignedRead, PositionRecord};
use test_case::test_case;

const GENOME: usize = 400;

fn assemble(reads: &[AlignedRead]) -> Vec<PositionRecord> {
    let mut assembler = PositionRecordAssembler::new(reference(GENOME));
    let mut records = Vec::new();
    for read in reads {
        records.extend(assembler.add_read(read).expect("read should assemble"));
    }
    records.extend(assembler.finish());
    records
}

fn record_at(records: &[PositionRecord], offset: u32) -> &PositionRecord {
    records
        .iter()
        .find(|r| r.position == AbsolutePosition::new(0, offset))
        .unwrap_or_else(|| panic!("no record at {offset}"))
}

#[test]
fn insertion_attaches_to_preceding_position() {
    let genome = sequence(GENOME);
    let mut bases = genome[100..102].to_vec();
    bases.push(b'T');
    bases.extend_from_slice(&genome[102..104]);
    let records = assemble(&[read(100, "2M1I2M", &bases)]);

    let anchor = record_at(&records, 101);
    assert_eq!(anchor.features.len(), 1);
    assert_eq!(anchor.features[0].code, FeatureCode::Insertion);
    assert_eq!(anchor.features[0].bases, b"T");
    assert_eq!(anchor.quality_scores.len(), 2);
    assert!(record_at(&records, 102).features.is_empty());
    assert_eq!(records.len(), 4);
}

#[test]
fn deletion_marks_each_deleted_position() {
    let genome = sequence(GENOME);
    let mut bases = genome[10..12].to_vec();
    bases.extend_from_slice(&genome[14..16]);
    let records = assemble(&[read(10, "2M2D2M", &bases)]);
    assert_eq!(records.len(), 6);

    for offset in [12, 13] {
        let record = record_at(&records, offset);
        assert_eq!(record.features.len(), 1);
        assert_eq!(record.features[0].code, FeatureCode::Deletion);
        assert_eq!(record.features[0].length, 1);
        assert!(record.quality_scores.is_empty());
        assert_eq!(record.coverage, 1);
    }
}

#[test_case("3M", 3; "plain match")]
#[test_case("1S3M", 4; "leading soft clip")]
#[test_case("3M2H", 3; "trailing hard clip")]
#[test_case("2M1I1M", 4; "internal insertion")]
fn qualities_are_fully_consumed(cigar: &str, read_len: usize) {
    let genome = sequence(GENOME);
    let bases = genome[50..50 + read_len].to_vec();
    let records = assemble(&[read(50, cigar, &bases)]);
    let consumed: usize = records.iter().map(|r| r.quality_scores.len()).sum();
    assert_eq!(consumed, read_len);
}

#[test]
fn read_header_is_stored_at_start() {
    let genome = sequence(GENOME);
    let read = matching_read(&genome, 20, 5).with_mapq(42).with_reverse(true);
    let records = assemble(&[read]);
    let header = &record_at(&records, 20).read_headers[0];
    assert_eq!(header.mapping_quality, 42);
    assert!(header.is_reverse);
    assert_eq!(header.reference_span, 5);
    assert!(records[1..].iter().all(|r| r.read_headers.is_empty()));
}

#[test]
fn leading_clip_codes_differ_from_trailing() {
    let genome = sequence(GENOME);
    let mut bases = b"GG".to_vec();
    bases.extend_from_slice(&genome[30..33]);
    bases.extend_from_slice(b"CC");
    let records = assemble(&[read(30, "2S3M2S", &bases)]);
    assert_eq!(record_at(&records, 30).features[0].code, FeatureCode::LeadingSoftClip);
    assert_eq!(record_at(&records, 32).features[0].code, FeatureCode::SoftClip);
}

fn read_strategy() -> impl Strategy<Value = (u32, Vec<u8>)> {
    (0u32..300, proptest::collection::vec(
        prop_oneof![Just(b'A'), Just(b'C'), Just(b'G'), Just(b'T')],
        1..60,
    ))
}

proptest! {
    #[test]
    fn match_only_reads_yield_one_feature_per_mismatch((pos, bases) in read_strategy()) {
        let genome = sequence(GENOME);
        let read = read(pos, &format!("{}M", bases.len()), &bases);
        let records = assemble(&[read]);

        prop_assert_eq!(records.len(), bases.len());
        for (i, record) in records.iter().enumerate() {
            let reference_base = genome[pos as usize + i];
            prop_assert_eq!(record.reference_base, reference_base);
            prop_assert!(record.features.len() <= 1);
            prop_assert_eq!(record.features.len() == 1, bases[i] != reference_base);
            if let Some(feature) = record.features.first() {
                prop_assert_eq!(&feature.bases, &vec![bases[i]]);
            }
        }
        let qualities: usize = records.iter().map(|r| r.quality_scores.len()).sum();
        prop_assert_eq!(qualities, bases.len());
    }

    #[test]
    fn coverage_counts_touching_reads(
        mut spans in proptest::collection::vec((0u32..200, 1usize..40), 1..25),
    ) {
        spans.sort();
        let genome = sequence(GENOME);
        let reads: Vec<AlignedRead> = spans
            .iter()
            .map(|&(pos, len)| matching_read(&genome, pos, len))
            .collect();
        let records = assemble(&reads);

        for record in &records {
            let offset = record.position.offset();
            let touching = spans
                .iter()
                .filter(|&&(pos, len)| pos <= offset && offset < pos + len as u32)
                .count();
            prop_assert_eq!(record.coverage as usize, touching);
        }
    }

    #[test]
    fn sorted_input_emits_strictly_ascending_records(
        mut spans in proptest::collection::vec((0u32..200, 1usize..40), 1..25),
    ) {
        spans.sort();
        let genome = sequence(GENOME);
        let mut assembler = PositionRecordAssembler::new(reference(GENOME));
        let mut emitted: Vec<AbsolutePosition> = Vec::new();
        let mut max_end = 0u32;

        for &(pos, len) in &spans {
            let closed = assembler.add_read(&matching_read(&genome, pos, len)).unwrap();
            for record in &closed {
                // nothing at or after the current start may close early
                prop_assert!(record.position < AbsolutePosition::new(0, pos));
            }
            emitted.extend(closed.iter().map(|r| r.position));
            max_end = max_end.max(pos + len as u32);
            prop_assert!(assembler.open_builders() <= (max_end - pos) as usize);
        }
        emitted.extend(assembler.finish().iter().map(|r| r.position));

        prop_assert!(emitted.windows(2).all(|w| w[0] < w[1]));
        let covered: std::collections::BTreeSet<u32> = spans
            .iter()
            .flat_map(|&(pos, len)| pos..pos + len as u32)
            .collect();
        prop_assert_eq!(emitted.len(), covered.len());
    }
}
