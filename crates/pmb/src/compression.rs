//! zstd compression for artifacts that are not encrypted.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

/// The magic bytes at the start of a zstd compressed file.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Default compression level for zstd (1-22, higher = better compression but slower).
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 19;

/// Check if a file is zstd compressed by reading its magic bytes.
pub fn is_zstd_compressed(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == ZSTD_MAGIC),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Compress `input_path` into `output_path` at the given level.
///
/// The output is fsynced before returning.
pub fn compress_file(input_path: &Path, output_path: &Path, level: i32) -> io::Result<()> {
    debug!(?input_path, ?output_path, level, "Compressing file");

    let mut input = BufReader::new(File::open(input_path)?);
    let output = File::create(output_path)?;

    let mut encoder = zstd::stream::Encoder::new(BufWriter::new(output), level)?;
    io::copy(&mut input, &mut encoder)?;
    let writer = encoder.finish()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    Ok(())
}

/// Decompress a zstd compressed file. Input without the zstd magic is
/// rejected before `output_path` is created.
pub fn decompress_file(input_path: &Path, output_path: &Path) -> io::Result<()> {
    debug!(?input_path, ?output_path, "Decompressing file");
    if !is_zstd_compressed(input_path)? {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{input_path:?} is not zstd data"),
        ));
    }

    let input_reader = BufReader::new(File::open(input_path)?);
    let mut output_writer = BufWriter::new(File::create(output_path)?);

    let mut decoder = zstd::stream::Decoder::new(input_reader)?;
    io::copy(&mut decoder, &mut output_writer)?;
    output_writer.flush()?;

    Ok(())
}
