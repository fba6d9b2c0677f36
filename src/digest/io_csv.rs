// Primitives for reading the tally files.

use std::borrow::Cow;
use std::fs::File;

use csv::ByteRecord;
use encoding_rs::mem;

use crate::digest::*;

/// A tally file whose header has been read.
pub struct TallySource {
    path: String,
    reader: csv::Reader<File>,
    header: Vec<String>,
}

// The files are published in ISO-8859-1: every byte is the code point of the same value.
fn decode_latin1(bytes: &[u8]) -> Cow<'_, str> {
    mem::decode_latin1(bytes)
}

pub fn open_source(path: &Path, delimiter: u8) -> DigestResult<TallySource> {
    let p = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)
        .context(OpeningCsvSnafu { path: p.clone() })?;
    let header: Vec<String> = reader
        .byte_headers()
        .context(OpeningCsvSnafu { path: p.clone() })?
        .iter()
        .map(|h| decode_latin1(h).to_string())
        .collect();
    debug!("open_source: {:?} header: {:?}", p, header);
    Ok(TallySource {
        path: p,
        reader,
        header,
    })
}

impl TallySource {
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Reads the rest of the file, handing rows to `sink` by batches of at most
    /// `chunk_size` rows.
    ///
    /// Rows that cannot be parsed are passed along as errors. Only an I/O failure
    /// interrupts the reading. Returns the number of rows read.
    pub fn read_chunks<F>(
        &mut self,
        columns: &ColumnMap,
        chunk_size: usize,
        mut sink: F,
    ) -> DigestResult<u64>
    where
        F: FnMut(Vec<Result<RawRecord, RowError>>),
    {
        let chunk_size = chunk_size.max(1);
        let mut batch: Vec<Result<RawRecord, RowError>> = Vec::with_capacity(chunk_size);
        let mut record = ByteRecord::new();
        let mut num_rows: u64 = 0;
        loop {
            match self.reader.read_byte_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {
                    let fields: Vec<Cow<str>> = record.iter().map(decode_latin1).collect();
                    batch.push(columns.extract(&fields));
                }
                Err(e) if e.is_io_error() => {
                    return Err(e).context(ReadingCsvSnafu {
                        path: self.path.clone(),
                    });
                }
                Err(e) => {
                    debug!("read_chunks: {}: {}", self.path, e);
                    batch.push(Err(RowError::Unparseable(e.to_string())));
                }
            }
            num_rows += 1;
            if batch.len() >= chunk_size {
                sink(std::mem::replace(&mut batch, Vec::with_capacity(chunk_size)));
            }
        }
        if !batch.is_empty() {
            sink(batch);
        }
        Ok(num_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, contents).unwrap();
        p
    }

    const HEADER: &[u8] =
        b"\"SG_UF\";\"CD_MUNICIPIO\";\"DS_CARGO\";\"NM_URNA_CANDIDATO\";\"SG_PARTIDO\";\"QT_VOTOS\"\n";

    #[test]
    fn decodes_latin1() {
        let dir = tempfile::tempdir().unwrap();
        let mut contents = HEADER.to_vec();
        // "JOS\xc9" is JOSÉ in Latin-1
        contents.extend_from_slice(b"\"SP\";\"71072\";\"PRESIDENTE\";\"JOS\xc9\";\"PT\";\"12\"\n");
        let p = write_file(dir.path(), "t_2022.csv", &contents);

        let mut source = open_source(&p, b';').unwrap();
        let columns = ColumnMap::resolve(source.header(), Granularity::TwoLevel).unwrap();
        let mut rows: Vec<Result<RawRecord, RowError>> = Vec::new();
        let n = source
            .read_chunks(&columns, 10, |batch| rows.extend(batch))
            .unwrap();
        assert_eq!(n, 1);
        let rec = rows[0].clone().unwrap();
        assert_eq!(rec.candidate_name, "JOSÉ");
        assert_eq!(rec.votes, 12);
    }

    #[test]
    fn bytes_decode_to_same_code_points() {
        assert_eq!(decode_latin1(b"\x96"), "\u{96}");
        assert_eq!(decode_latin1(b"S\xc3O"), "S\u{c3}O");
        assert_eq!(decode_latin1(b"PT"), "PT");
    }

    #[test]
    fn chunks_are_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let mut contents = HEADER.to_vec();
        for i in 0..7 {
            contents.extend_from_slice(
                format!("SP;71072;PRESIDENTE;C{};P;{}\n", i, i).as_bytes(),
            );
        }
        let p = write_file(dir.path(), "t_2022.csv", &contents);
        let mut source = open_source(&p, b';').unwrap();
        let columns = ColumnMap::resolve(source.header(), Granularity::TwoLevel).unwrap();
        let mut sizes: Vec<usize> = Vec::new();
        source
            .read_chunks(&columns, 3, |batch| sizes.push(batch.len()))
            .unwrap();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn bad_rows_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut contents = HEADER.to_vec();
        contents.extend_from_slice(b"SP;71072;PRESIDENTE;A;P;1\n");
        contents.extend_from_slice(b"SP;71072;PRESIDENTE;B;P\n");
        contents.extend_from_slice(b"SP;71072;PRESIDENTE;C;P;dez\n");
        contents.extend_from_slice(b"SP;71072;PRESIDENTE;D;P;4\n");
        let p = write_file(dir.path(), "t_2022.csv", &contents);
        let mut source = open_source(&p, b';').unwrap();
        let columns = ColumnMap::resolve(source.header(), Granularity::TwoLevel).unwrap();
        let mut rows: Vec<Result<RawRecord, RowError>> = Vec::new();
        source
            .read_chunks(&columns, 100, |batch| rows.extend(batch))
            .unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows[0].is_ok());
        assert!(matches!(rows[1], Err(RowError::Unparseable(_))));
        assert_eq!(rows[2], Err(RowError::InvalidVoteCount("dez".to_string())));
        assert!(rows[3].is_ok());
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let res = open_source(&dir.path().join("nope_2022.csv"), b';');
        assert!(matches!(res, Err(DigestError::OpeningCsv { .. })));
    }
}
