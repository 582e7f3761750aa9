//! Gzip compression of expired day files

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

/// Archive path for a day file
pub(crate) fn archive_path(archive_dir: &Path, filename: &str) -> PathBuf {
    archive_dir.join(format!("{}.gz", filename))
}

/// Compress `source` into `target` as gzip
///
/// Returns only after the encoder has finished and the target is synced. A
/// partially written target is removed on failure; `source` is never touched.
pub fn compress_file(source: &Path, target: &Path) -> io::Result<()> {
    let result = write_gzip(source, target);
    if result.is_err() && target.is_file() {
        let _ = fs::remove_file(target);
    }
    result
}

fn write_gzip(source: &Path, target: &Path) -> io::Result<()> {
    let mut input = BufReader::new(File::open(source)?);
    let output = BufWriter::new(File::create(target)?);

    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    let mut output = encoder.finish()?;
    output.flush()?;

    let file = output.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}
