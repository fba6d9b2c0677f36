use crate::digest::*;

pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// The years that appear in the name of a file, in the order of `years`.
pub fn detect_years(file_name: &str, years: &[u32]) -> Vec<u32> {
    years
        .iter()
        .filter(|y| file_name.contains(&y.to_string()))
        .copied()
        .collect()
}

/// Lists the CSV files of the input directory, sorted by name.
///
/// Links whose target cannot be read are listed as well, so that opening them is
/// reported as an I/O failure.
pub fn discover_files(dir: &Path) -> DigestResult<Vec<PathBuf>> {
    let path = dir.display().to_string();
    let entries = fs::read_dir(dir).context(ReadingInputDirSnafu { path: path.clone() })?;
    let mut res: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.context(ReadingInputDirSnafu { path: path.clone() })?;
        let p = entry.path();
        let is_csv = p
            .extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        let is_link = entry
            .file_type()
            .map(|t| t.is_symlink())
            .unwrap_or(false);
        if !is_csv {
            debug!("discover_files: ignoring {:?}", p);
        } else if p.is_file() {
            res.push(p);
        } else if is_link {
            warn!("{:?} links to a file that cannot be read", p);
            res.push(p);
        } else {
            debug!("discover_files: ignoring {:?}", p);
        }
    }
    res.sort();
    Ok(res)
}
