use std::io::Write;

use anyhow::{anyhow, Result};

use crate::genomics::ReferenceDictionary;
use crate::pileup::{PositionFeature, PositionRecord};

const HEADER: &str = "#CHROM\tPOS\tREF\tDEPTH\tREADS\tFEATURES\tQUALS\n";

/// Write records as tab-separated lines with 0-based positions.
///
/// `READS` lists read headers as `index:mapq:strand:span`; `FEATURES` lists
/// `index:op:length[:bases]`, with a `^` prefix on the operation for features
/// that precede the read's first aligned base.
pub fn write_records<'a, W, I>(writer: &mut W, references: &ReferenceDictionary, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a PositionRecord>,
{
    write_header(writer)?;
    for record in records {
        writer.write_all(format_record(references, record).as_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the column header line.
pub fn write_header<W: Write>(writer: &mut W) -> Result<()> {
    writer.write_all(HEADER.as_bytes())?;
    Ok(())
}

/// Render records into a string (useful for tests and snapshots).
pub fn render_records(references: &ReferenceDictionary, records: &[PositionRecord]) -> Result<String> {
    let mut buffer = Vec::new();
    write_records(&mut buffer, references, records)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered records are not valid UTF-8"))
}

/// One line, newline included.
pub fn format_record(references: &ReferenceDictionary, record: &PositionRecord) -> String {
    let chrom = references
        .get(record.position.reference_id())
        .map_or_else(|| record.position.reference_id().to_string(), |entry| entry.name.clone());

    let reads = join(record.read_headers.iter().map(|header| {
        format!(
            "{}:{}:{}:{}",
            header.coverage_index,
            header.mapping_quality,
            if header.is_reverse { '-' } else { '+' },
            header.reference_span
        )
    }));
    let features = join(record.features.iter().map(format_feature));
    let quals = join(record.quality_scores.iter().map(u8::to_string));

    format!(
        "{chrom}\t{pos}\t{ref_base}\t{depth}\t{reads}\t{features}\t{quals}\n",
        pos = record.position.offset(),
        ref_base = record.reference_base as char,
        depth = record.coverage,
    )
}

fn format_feature(feature: &PositionFeature) -> String {
    let mut out = feature.coverage_index.to_string();
    out.push(':');
    if feature.code.is_leading() {
        out.push('^');
    }
    out.push(feature.code.operation().symbol());
    out.push(':');
    out.push_str(&feature.length.to_string());
    if !feature.bases.is_empty() {
        out.push(':');
        out.extend(feature.bases.iter().map(|&b| b as char));
    }
    out
}

fn join(items: impl Iterator<Item = String>) -> String {
    let joined = items.collect::<Vec<_>>().join(",");
    if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
