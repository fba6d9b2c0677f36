use std::fs::File;
use std::io::{BufWriter, Write};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::digest::*;

fn units_to_json(units: &[(String, ReducedUnit)]) -> JSValue {
    let mut res: JSMap<String, JSValue> = JSMap::new();
    for (code, unit) in units.iter() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for (identity, count) in unit.entries.iter() {
            tally.insert(identity.clone(), json!(count));
        }
        res.insert(code.clone(), JSValue::Object(tally));
    }
    JSValue::Object(res)
}

/// The JSON representation of a document. Units and candidates keep the order
/// of the document.
pub fn document_to_json(doc: &OutputDocument) -> JSValue {
    let mut js: JSMap<String, JSValue> = JSMap::new();
    js.insert(
        "meta".to_string(),
        json!({"year": doc.meta.year, "office": doc.meta.office.name()}),
    );
    if let Some(states) = &doc.states {
        js.insert("states".to_string(), units_to_json(states));
    }
    js.insert(
        "municipalities".to_string(),
        units_to_json(&doc.municipalities),
    );
    JSValue::Object(js)
}

/// Writes a document in the output directory and returns its path.
pub fn write_document(dir: &Path, doc: &OutputDocument) -> DigestResult<PathBuf> {
    let p = dir.join(doc.file_name());
    let path = p.display().to_string();
    let file = File::create(&p).context(WritingDocumentSnafu { path: path.clone() })?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer(&mut w, &document_to_json(doc))
        .context(SerializingJsonSnafu { path: path.clone() })?;
    w.flush().context(WritingDocumentSnafu { path })?;
    Ok(p)
}

pub fn read_document(path: &Path) -> DigestResult<JSValue> {
    let p = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningReferenceSnafu { path: p.clone() })?;
    serde_json::from_str(contents.as_str()).context(ParsingReferenceSnafu { path: p })
}

/// Compares the written documents to the documents with the same name in the
/// reference directory and prints the differences.
///
/// Returns the number of documents that differ or have no reference.
pub fn compare_with_reference(reference_dir: &Path, written: &[PathBuf]) -> DigestResult<usize> {
    let mut mismatches = 0;
    for p in written.iter() {
        let name = io_common::simplify_file_name(p);
        let ref_p = reference_dir.join(&name);
        if !ref_p.is_file() {
            warn!("No reference document for {}", name);
            mismatches += 1;
            continue;
        }
        let pretty = |js: &JSValue, path: &Path| -> DigestResult<String> {
            serde_json::to_string_pretty(js).context(SerializingJsonSnafu {
                path: path.display().to_string(),
            })
        };
        let computed = pretty(&read_document(p)?, p)?;
        let reference = pretty(&read_document(&ref_p)?, &ref_p)?;
        if computed != reference {
            warn!("Found differences with the reference document {}", name);
            print_diff(reference.as_str(), computed.as_str(), "\n");
            mismatches += 1;
        } else {
            debug!("compare_with_reference: {} matches", name);
        }
    }
    Ok(mismatches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> OutputDocument {
        let mut b = builder::Builder::new(&AggregationRules::default())
            .unwrap()
            .top_n(1);
        b.add_row("SP", "71072", "PRESIDENTE", "CANDIDATE A", "PARTY1", 100);
        b.add_row("SP", "71072", "PRESIDENTE", "CANDIDATE B", "PARTY2", 50);
        b.add_row("SP", "71072", "PRESIDENTE", "JOSÉ", "PSÓ", 10);
        b.build(2022).remove(0)
    }

    #[test]
    fn document_shape() {
        let js = document_to_json(&sample_doc());
        assert_eq!(
            js,
            json!({
                "meta": {"year": 2022, "office": "PRESIDENT"},
                "states": {"35": {
                    "CANDIDATE A (PARTY1)": 100,
                    "CANDIDATE B (PARTY2)": 50,
                    "JOSÉ (PSÓ)": 10
                }},
                "municipalities": {"71072": {
                    "CANDIDATE A (PARTY1)": 100,
                    "Others (OTHERS)": 60
                }}
            })
        );
    }

    #[test]
    fn written_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_document(dir.path(), &sample_doc()).unwrap();
        assert_eq!(simplify_name(&p), "2022_president.json");
        let s = fs::read_to_string(&p).unwrap();
        // Compact, ranked order, non-ASCII characters unescaped
        assert_eq!(
            s,
            "{\"meta\":{\"year\":2022,\"office\":\"PRESIDENT\"},\
             \"states\":{\"35\":{\"CANDIDATE A (PARTY1)\":100,\"CANDIDATE B (PARTY2)\":50,\"JOSÉ (PSÓ)\":10}},\
             \"municipalities\":{\"71072\":{\"CANDIDATE A (PARTY1)\":100,\"Others (OTHERS)\":60}}}"
        );
    }

    fn simplify_name(p: &Path) -> String {
        io_common::simplify_file_name(p)
    }

    #[test]
    fn reference_comparison() {
        let out = tempfile::tempdir().unwrap();
        let reference = tempfile::tempdir().unwrap();
        let p = write_document(out.path(), &sample_doc()).unwrap();
        // No reference yet
        assert_eq!(compare_with_reference(reference.path(), &[p.clone()]).unwrap(), 1);
        // Same content, different formatting
        let pretty = serde_json::to_string_pretty(&document_to_json(&sample_doc())).unwrap();
        fs::write(reference.path().join("2022_president.json"), pretty).unwrap();
        assert_eq!(compare_with_reference(reference.path(), &[p.clone()]).unwrap(), 0);
        fs::write(
            reference.path().join("2022_president.json"),
            "{\"meta\":{\"year\":2022,\"office\":\"PRESIDENT\"}}",
        )
        .unwrap();
        assert_eq!(compare_with_reference(reference.path(), &[p]).unwrap(), 1);
    }
}
