use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use rust_htslib::faidx;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::genomics::AbsolutePosition;

/// Errors raised while resolving reference bases.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// The dictionary has no entry for the requested id.
    #[error("unknown reference id {0}")]
    UnknownReference(u32),

    /// No sequence was supplied for a reference named in the dictionary.
    #[error("reference sequence '{0}' not found")]
    MissingSequence(String),

    /// The supplied sequence does not match the length the dictionary declares.
    #[error("reference sequence '{name}' has length {actual}, expected {expected}")]
    LengthMismatch {
        /// Reference name.
        name: String,
        /// Length declared by the alignment header.
        expected: u64,
        /// Length of the loaded sequence.
        actual: u64,
    },

    /// Lookup beyond the end of a reference.
    #[error("position {position} lies beyond the end of reference '{name}'")]
    OutOfBounds {
        /// Reference name.
        name: String,
        /// Offending position.
        position: AbsolutePosition,
    },

    /// The FASTA file or its `.fai` index could not be opened.
    #[error("failed to open FASTA '{path}': {source}")]
    Fasta {
        /// FASTA path as given.
        path: String,
        /// Underlying htslib error.
        source: rust_htslib::errors::Error,
    },
}

/// Reference sequence described by an alignment header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    /// Sequence name.
    pub name: String,
    /// Sequence length in bases.
    pub length: u64,
}

/// Ordered reference names and lengths; the position of an entry is its id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceDictionary {
    entries: Vec<ReferenceEntry>,
    #[serde(skip)]
    name_to_id: HashMap<String, u32>,
}

impl ReferenceDictionary {
    /// Empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, length)` pairs in id order.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut dictionary = Self::new();
        for (name, length) in entries {
            dictionary.push(name, length);
        }
        dictionary
    }

    /// Append a reference and return its id.
    pub fn push(&mut self, name: impl Into<String>, length: u64) -> u32 {
        let name = name.into();
        let id = self.entries.len() as u32;
        self.name_to_id.insert(name.clone(), id);
        self.entries.push(ReferenceEntry { name, length });
        id
    }

    /// Id for a reference name.
    pub fn id_of(&self, name: &str) -> Option<u32> {
        if self.name_to_id.len() == self.entries.len() {
            return self.name_to_id.get(name).copied();
        }
        // Deserialized dictionaries skip the lookup table.
        self.entries
            .iter()
            .position(|entry| entry.name == name)
            .map(|idx| idx as u32)
    }

    /// Entry for a reference id.
    pub fn get(&self, id: u32) -> Option<&ReferenceEntry> {
        self.entries.get(id as usize)
    }

    /// Number of references.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no references are declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ReferenceEntry> {
        self.entries.iter()
    }

}

impl PartialEq for ReferenceDictionary {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for ReferenceDictionary {}

/// Reference base lookup keyed by absolute position.
pub trait ReferenceSource {
    /// Uppercase ASCII base at `position`.
    fn base_at(&self, position: AbsolutePosition) -> Result<u8, ReferenceError>;
}

impl<T: ReferenceSource + ?Sized> ReferenceSource for &T {
    fn base_at(&self, position: AbsolutePosition) -> Result<u8, ReferenceError> {
        (**self).base_at(position)
    }
}

/// Reference sequences held in memory, indexed by reference id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReference {
    names: Vec<String>,
    sequences: Vec<Option<Arc<[u8]>>>,
}

impl InMemoryReference {
    /// Empty reference set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sequence under the next id and return that id.
    pub fn push(&mut self, name: impl Into<String>, bases: &[u8]) -> u32 {
        let id = self.names.len() as u32;
        self.names.push(name.into());
        self.sequences
            .push(Some(Arc::from(bases.to_ascii_uppercase().into_boxed_slice())));
        id
    }

    /// Dictionary describing the held sequences.
    pub fn dictionary(&self) -> ReferenceDictionary {
        ReferenceDictionary::from_entries(self.names.iter().zip(&self.sequences).map(
            |(name, seq)| (name.clone(), seq.as_ref().map_or(0, |s| s.len() as u64)),
        ))
    }

    /// Arrange named sequences in dictionary order.
    ///
    /// Sequences that are present must match the declared length. Absent ones
    /// are tolerated until a base is actually requested from them.
    pub fn resolve(
        dictionary: &ReferenceDictionary,
        mut named: HashMap<String, Vec<u8>>,
    ) -> Result<Self, ReferenceError> {
        let mut names = Vec::with_capacity(dictionary.len());
        let mut sequences = Vec::with_capacity(dictionary.len());
        for entry in dictionary.iter() {
            let sequence = match named.remove(&entry.name) {
                Some(bases) => {
                    if bases.len() as u64 != entry.length {
                        return Err(ReferenceError::LengthMismatch {
                            name: entry.name.clone(),
                            expected: entry.length,
                            actual: bases.len() as u64,
                        });
                    }
                    Some(Arc::from(bases.into_boxed_slice()))
                }
                None => None,
            };
            names.push(entry.name.clone());
            sequences.push(sequence);
        }
        Ok(Self { names, sequences })
    }
}

impl ReferenceSource for InMemoryReference {
    fn base_at(&self, position: AbsolutePosition) -> Result<u8, ReferenceError> {
        let id = position.reference_id();
        let slot = self
            .sequences
            .get(id as usize)
            .ok_or(ReferenceError::UnknownReference(id))?;
        let sequence = slot
            .as_ref()
            .ok_or_else(|| ReferenceError::MissingSequence(self.names[id as usize].clone()))?;
        sequence
            .get(position.offset() as usize)
            .copied()
            .ok_or_else(|| ReferenceError::OutOfBounds {
                name: self.names[id as usize].clone(),
                position,
            })
    }
}

/// Load the dictionary's sequences from an indexed FASTA.
///
/// htslib builds `<path>.fai` when it is missing. Each dictionary entry is
/// fetched whole by name and checked against the declared `@SQ LN`. Names the
/// FASTA does not contain are left absent until a base is requested.
pub fn load_fasta_reference(
    path: &Path,
    dictionary: &ReferenceDictionary,
) -> Result<InMemoryReference, ReferenceError> {
    let fasta_error = |source: rust_htslib::errors::Error| ReferenceError::Fasta {
        path: path.display().to_string(),
        source,
    };
    let reader = faidx::Reader::from_path(path).map_err(fasta_error)?;
    let indexed = (0..reader.n_seqs())
        .map(|i| reader.seq_name(i as i32))
        .collect::<Result<HashSet<_>, _>>()
        .map_err(fasta_error)?;

    let mut named = HashMap::with_capacity(dictionary.len());
    for entry in dictionary.iter() {
        // fetching a name the index lacks is undefined in htslib
        if !indexed.contains(&entry.name) {
            debug!(name = %entry.name, "reference sequence absent from FASTA");
            continue;
        }
        let bases = fetch_sequence(&reader, &entry.name).map_err(fasta_error)?;
        named.insert(entry.name.clone(), bases);
    }
    debug!(
        path = %path.display(),
        sequences = named.len(),
        declared = dictionary.len(),
        "loaded reference FASTA"
    );
    InMemoryReference::resolve(dictionary, named)
}

/// Whole uppercase sequence for an indexed name.
fn fetch_sequence(
    reader: &faidx::Reader,
    name: &str,
) -> Result<Vec<u8>, rust_htslib::errors::Error> {
    // htslib clamps the end to the last base
    let seq = reader.fetch_seq(name, 0, i64::MAX as usize)?;
    let bases = seq.to_ascii_uppercase();
    // the buffer is malloc'd by htslib and never freed by rust-htslib
    unsafe { libc::free(seq.as_ptr() as *mut libc::c_void) };
    Ok(bases)
}
