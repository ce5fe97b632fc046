use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Write `content` to `target` through a temp file in the same directory so
/// readers never see a partial file.
pub fn write_atomic(target: &Path, content: &str) -> Result<PathBuf> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(&dir)
        .with_context(|| format!("cannot create a temp file in {}", dir.display()))?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(target)
        .map_err(|err| err.error)
        .with_context(|| format!("cannot replace {}", target.display()))?;
    Ok(target.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::write_atomic;
    use std::fs;

    #[test]
    fn creates_parent_dirs_and_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out.txt");

        write_atomic(&target, "first").unwrap();
        write_atomic(&target, "second").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "second");
        let leftovers = fs::read_dir(target.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
