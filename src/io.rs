use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

fn is_gz(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".gz")
}

/// Read a tree file with one newick string per line.
///
/// Returns `(line_number, text)` pairs with 1-based line numbers; blank lines
/// are skipped. If `path` ends with `.gz`, the file is decompressed first.
pub fn read_newick_lines<P: AsRef<Path>>(path: P) -> io::Result<Vec<(usize, String)>> {
    let p = path.as_ref();
    let file = File::open(p)?;
    let reader: Box<dyn Read> = if is_gz(p) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut lines = Vec::new();
    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            lines.push((idx + 1, trimmed.to_string()));
        }
    }
    Ok(lines)
}

/// Write a square matrix as headerless, row-major CSV.
/// If `path` ends with `.gz`, the output is gzip-compressed.
pub fn write_matrix_csv<P: AsRef<Path>, T: std::fmt::Display>(path: P, mat: &[Vec<T>]) -> io::Result<()> {
    let p = path.as_ref();
    let mut out: Box<dyn Write> = if is_gz(p) {
        let f = File::create(p)?;
        let enc = GzEncoder::new(f, Compression::default());
        Box::new(BufWriter::new(enc))
    } else {
        Box::new(BufWriter::new(File::create(p)?))
    };

    write_csv(&mut out, mat)?;
    out.flush()?;
    Ok(())
}

fn write_csv<W: Write, T: std::fmt::Display>(out: &mut W, mat: &[Vec<T>]) -> io::Result<()> {
    for row in mat {
        for (k, val) in row.iter().enumerate() {
            if k > 0 {
                write!(out, ",")?;
            }
            write!(out, "{}", val)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
