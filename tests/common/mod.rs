#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use secram::genomics::{parse_cigar, InMemoryReference};
use secram::{AlignedRead, QueryEngine, SecramConfig, SecramWriter, WriteSummary};

pub const KEY: &[u8] = b"correct horse battery staple";

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("SECRAM_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set SECRAM_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// Deterministic uppercase sequence.
pub fn sequence(len: usize) -> Vec<u8> {
    (0..len).map(|i| b"ACGT"[(i * 7 + i / 3) % 4]).collect()
}

/// Single-reference in-memory genome named `chr1`.
pub fn reference(len: usize) -> InMemoryReference {
    let mut reference = InMemoryReference::new();
    reference.push("chr1", &sequence(len));
    reference
}

pub fn read(pos: u32, cigar: &str, seq: &[u8]) -> AlignedRead {
    AlignedRead::new(
        0,
        pos,
        parse_cigar(cigar).expect("valid CIGAR"),
        seq.to_vec(),
        vec![30u8; seq.len()],
    )
}

/// Read of `len` bases matching `genome` exactly from `pos`.
pub fn matching_read(genome: &[u8], pos: u32, len: usize) -> AlignedRead {
    let start = pos as usize;
    read(pos, &format!("{len}M"), &genome[start..start + len])
}

/// Write `reads` into an in-memory SECRAM file.
pub fn write_secram(
    reads: &[AlignedRead],
    reference: InMemoryReference,
    config: &SecramConfig,
) -> (Vec<u8>, WriteSummary) {
    let references = reference.dictionary();
    let mut writer = SecramWriter::new(Vec::new(), references, reference, KEY, config)
        .expect("writer should start");
    for read in reads {
        writer.add_read(read).expect("read should be accepted");
    }
    writer.finish().expect("writer should finish")
}

/// Query engine over an in-memory file.
pub fn engine(bytes: Vec<u8>, summary: &WriteSummary, key: &[u8]) -> QueryEngine<Cursor<Vec<u8>>> {
    QueryEngine::open(Cursor::new(bytes), summary.index.clone(), key).expect("engine should open")
}
