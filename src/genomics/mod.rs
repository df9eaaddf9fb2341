//! Genomic primitives consumed by the pileup pipeline.
//!
//! Aligned reads and their CIGAR operations, the packed absolute position
//! used as the record key, and reference sequence lookup.

mod io;
mod nucleotide;
mod position;
mod reference;
mod types;

pub use io::{convert_cigar, convert_record, dictionary_from_header, open_bam};
pub use nucleotide::{decode_nucleotide, encode_nucleotide, NUCLEOTIDE_ALPHABET};
pub use position::AbsolutePosition;
pub use reference::{
    load_fasta_reference, InMemoryReference, ReferenceDictionary, ReferenceEntry,
    ReferenceError, ReferenceSource,
};
pub use types::{parse_cigar, AlignedRead, CigarOp, CigarOpKind};
