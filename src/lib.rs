// lib.rs
//
// rowgray: parallel RGB(A) to grayscale conversion
//
// The image is split into contiguous row ranges, one per worker, and every
// worker converts only its own rows. Three interchangeable substrates run the
// workers:
// - scoped OS threads writing into one shared output buffer
// - a fixed-size rayon pool, each pool thread picking its range by index
// - message-passing ranks (broadcast, scatter, compute, gather)
//
// All three produce byte-identical output for the same input.

pub mod engine;
pub mod error;
pub mod ops;

use error::RowGrayError;
use image::ImageReader;
use std::io::{BufRead, BufReader, Cursor, Seek};

pub use engine::{
    convert_file, run_executor, ConversionReport, ConvertOptions, ImageBuffer, RowRange,
    RunConfig,
};
pub use error::{ErrorCategory, Result};
pub use ops::{ExecutorKind, OutputFormat};

/// Header-level facts about an encoded image, read without decoding pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectMetadata {
    pub width: u32,
    pub height: u32,
    pub format: Option<String>,
}

fn read_inspect_metadata<R: BufRead + Seek>(reader: R) -> Result<InspectMetadata> {
    let reader = ImageReader::new(reader)
        .with_guessed_format()
        .map_err(|e| RowGrayError::decode_failed(format!("failed to read image header: {e}")))?;

    let format = reader.format().map(|f| format!("{:?}", f).to_lowercase());
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| RowGrayError::decode_failed(format!("failed to read dimensions: {e}")))?;

    Ok(InspectMetadata {
        width,
        height,
        format,
    })
}

/// Read dimensions and format from encoded bytes.
pub fn inspect_header_from_bytes(data: &[u8]) -> Result<InspectMetadata> {
    read_inspect_metadata(Cursor::new(data))
}

/// Read dimensions and format from a file, touching only its header.
pub fn inspect_header_from_path(path: &str) -> Result<InspectMetadata> {
    use std::fs::File;

    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RowGrayError::file_not_found(path.to_string())
        } else {
            RowGrayError::file_read_failed(path.to_string(), e)
        }
    })?;
    read_inspect_metadata(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspects_png_header() {
        let buf = ImageBuffer::from_raw(7, 3, 1, vec![0; 21]).unwrap();
        let bytes = engine::encoder::encode(&buf, OutputFormat::Png).unwrap();
        let meta = inspect_header_from_bytes(&bytes).unwrap();
        assert_eq!(meta.width, 7);
        assert_eq!(meta.height, 3);
        assert_eq!(meta.format.as_deref(), Some("png"));
    }

    #[test]
    fn inspect_rejects_garbage() {
        assert!(inspect_header_from_bytes(b"nope").is_err());
        assert!(matches!(
            inspect_header_from_path("/nonexistent/rowgray.png"),
            Err(RowGrayError::FileNotFound { .. })
        ));
    }
}
