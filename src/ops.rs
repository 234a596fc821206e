use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::btree::BTree;
use crate::error::IndexError;

//-------------------------------------------------------------------------

/// Create a new, empty index file at `path`.
pub fn create(path: &Path) -> Result<()> {
    BTree::create(path).with_context(|| format!("creating {}", path.display()))?;
    info!("created index {}", path.display());
    Ok(())
}

/// Insert a single `(key, value)` pair.
pub fn insert(path: &Path, key: u64, value: u64) -> Result<()> {
    let mut tree = BTree::open(path)?;
    tree.insert(key, value)?;
    info!("inserted {key},{value} into {}", path.display());
    Ok(())
}

/// Look up `key`, writing `key,value` to `out` on a hit.  Returns
/// `Err(IndexError::KeyNotFound)` on a miss so the caller can choose the
/// exit code and message.
pub fn search(path: &Path, key: u64, out: &mut dyn Write) -> Result<()> {
    let mut tree = BTree::open(path)?;
    match tree.search(key)? {
        Some(value) => {
            writeln!(out, "{key},{value}")?;
            Ok(())
        }
        None => Err(IndexError::KeyNotFound(key).into()),
    }
}

/// Stream `(key, value)` rows from a delimited text file and insert each.
/// Each row is its own durable unit: a parse failure partway through
/// leaves the prior rows committed, by design (see §7 of the format
/// spec).
pub fn load(path: &Path, csv_path: &Path) -> Result<()> {
    if !csv_path.exists() {
        return Err(IndexError::MissingInput(csv_path.to_path_buf()).into());
    }

    let mut tree = BTree::open(path)?;
    let file = File::open(csv_path)
        .with_context(|| format!("opening {}", csv_path.display()))?;
    let reader = BufReader::new(file);

    let mut nr_loaded = 0;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = parse_row(line)
            .with_context(|| format!("{}:{}: malformed row", csv_path.display(), lineno + 1))?;
        tree.insert(key, value)?;
        nr_loaded += 1;
    }

    info!("loaded {nr_loaded} rows from {}", csv_path.display());
    Ok(())
}

fn parse_row(line: &str) -> Result<(u64, u64)> {
    let mut fields = line.splitn(2, ',');
    let key = fields
        .next()
        .ok_or_else(|| IndexError::ParseFailure(line.to_string()))?;
    let value = fields
        .next()
        .ok_or_else(|| IndexError::ParseFailure(line.to_string()))?;

    let key: u64 = key
        .trim()
        .parse()
        .map_err(|_| IndexError::ParseFailure(line.to_string()))?;
    let value: u64 = value
        .trim()
        .parse()
        .map_err(|_| IndexError::ParseFailure(line.to_string()))?;
    Ok((key, value))
}

/// Emit all entries in ascending key order, one `key,value` per line.
pub fn print_all(path: &Path, out: &mut dyn Write) -> Result<()> {
    let mut tree = BTree::open(path)?;
    for (key, value) in tree.iter_ordered()? {
        writeln!(out, "{key},{value}")?;
    }
    Ok(())
}

/// Same output as [`print_all`], written to a new file. Fails if that
/// file already exists.
pub fn extract(path: &Path, out_path: &Path) -> Result<()> {
    if out_path.exists() {
        return Err(IndexError::OutputConflict(out_path.to_path_buf()).into());
    }

    let mut tree = BTree::open(path)?;
    let out_file = File::create(out_path)
        .with_context(|| format!("creating {}", out_path.display()))?;
    let mut writer = BufWriter::new(out_file);

    for (key, value) in tree.iter_ordered()? {
        writeln!(writer, "{key},{value}")?;
    }
    writer.flush()?;
    Ok(())
}

//-------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_row_accepts_plain_pair() {
        assert_eq!(parse_row("3,30").unwrap(), (3, 30));
    }

    #[test]
    fn parse_row_rejects_garbage() {
        assert!(parse_row("not,a,number").is_err());
        assert!(parse_row("5").is_err());
    }

    #[test]
    fn end_to_end_scenario_s2() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("idx");

        create(&path)?;
        insert(&path, 5, 50)?;
        insert(&path, 3, 30)?;
        insert(&path, 9, 90)?;

        let mut buf = Vec::new();
        print_all(&path, &mut buf)?;
        assert_eq!(String::from_utf8(buf).unwrap(), "3,30\n5,50\n9,90\n");
        Ok(())
    }

    #[test]
    fn end_to_end_scenario_s3() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("idx");
        create(&path)?;
        insert(&path, 5, 50)?;

        let mut hit = Vec::new();
        search(&path, 5, &mut hit)?;
        assert_eq!(String::from_utf8(hit).unwrap(), "5,50\n");

        let mut miss = Vec::new();
        let err = search(&path, 7, &mut miss).unwrap_err();
        assert!(err.downcast_ref::<IndexError>().is_some());
        Ok(())
    }

    #[test]
    fn load_commits_rows_durably_before_a_parse_failure() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("idx");
        let csv_path = dir.path().join("rows.csv");
        create(&path)?;
        std::fs::write(&csv_path, "1,10\n2,20\nbogus\n3,30\n").unwrap();

        assert!(load(&path, &csv_path).is_err());

        let mut buf = Vec::new();
        print_all(&path, &mut buf)?;
        assert_eq!(String::from_utf8(buf).unwrap(), "1,10\n2,20\n");
        Ok(())
    }

    #[test]
    fn extract_refuses_existing_output() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("idx");
        let out_path = dir.path().join("out.csv");
        create(&path)?;
        insert(&path, 1, 1)?;
        std::fs::write(&out_path, "existing").unwrap();

        let err = extract(&path, &out_path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::OutputConflict(_))
        ));
        Ok(())
    }
}

//-------------------------------------------------------------------------
