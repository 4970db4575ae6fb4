use crate::engine::error::DecodeError;
use crate::engine::playlist::is_playlist;
use flate2::write;
use std::io::Write;

/// How a response body is treated on its way back to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Markup,
    Playlist,
    Stylesheet,
    Passthrough,
}

impl ContentKind {
    /// Decides the body treatment from the upstream `Content-Type` and the
    /// destination path.
    pub fn classify(content_type: Option<&str>, path: &str) -> Self {
        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|m| m.trim().to_ascii_lowercase());

        match mime.as_deref() {
            Some("text/html" | "application/xhtml+xml") => ContentKind::Markup,
            _ if is_playlist(content_type, path) => ContentKind::Playlist,
            Some("text/css") => ContentKind::Stylesheet,
            _ => ContentKind::Passthrough,
        }
    }

    pub fn is_rewritten(&self) -> bool {
        !matches!(self, ContentKind::Passthrough)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Markup => "markup",
            ContentKind::Playlist => "playlist",
            ContentKind::Stylesheet => "stylesheet",
            ContentKind::Passthrough => "passthrough",
        }
    }
}

/// `Content-Encoding` of an upstream body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCoding {
    Identity,
    Gzip,
    Deflate,
    Brotli,
    /// Stacked or unknown codings. Such bodies are never rewritten.
    Unsupported,
}

impl ContentCoding {
    pub fn from_header(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return ContentCoding::Identity;
        };
        if value.contains(',') {
            return ContentCoding::Unsupported;
        }
        match value.to_ascii_lowercase().as_str() {
            "identity" => ContentCoding::Identity,
            "gzip" | "x-gzip" => ContentCoding::Gzip,
            "deflate" => ContentCoding::Deflate,
            "br" => ContentCoding::Brotli,
            _ => ContentCoding::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCoding::Identity => "identity",
            ContentCoding::Gzip => "gzip",
            ContentCoding::Deflate => "deflate",
            ContentCoding::Brotli => "br",
            ContentCoding::Unsupported => "unsupported",
        }
    }
}

/// Input is fed to the decompressor in slices of this size so that a single
/// call never inflates more than a bounded amount past the output limit.
const FEED_SIZE: usize = 1024;

enum Sink {
    Identity(Vec<u8>),
    Gzip(write::MultiGzDecoder<Vec<u8>>),
    Zlib(write::ZlibDecoder<Vec<u8>>),
    Deflate(write::DeflateDecoder<Vec<u8>>),
    /// Waiting for the first two bytes to tell zlib-wrapped from raw deflate.
    PendingDeflate(Vec<u8>),
    Brotli(Box<brotli::DecompressorWriter<Vec<u8>>>),
}

/// Incremental, size-bounded decoder for one upstream body.
///
/// Output is drained after every [`BodyDecoder::write`], so memory held by the
/// decoder itself stays small no matter how far the body inflates.
pub struct BodyDecoder {
    coding: ContentCoding,
    sink: Sink,
    produced: u64,
}

impl BodyDecoder {
    pub fn new(coding: ContentCoding) -> Result<Self, DecodeError> {
        let sink = match coding {
            ContentCoding::Identity => Sink::Identity(Vec::new()),
            ContentCoding::Gzip => Sink::Gzip(write::MultiGzDecoder::new(Vec::new())),
            ContentCoding::Deflate => Sink::PendingDeflate(Vec::new()),
            ContentCoding::Brotli => Sink::Brotli(Box::new(brotli::DecompressorWriter::new(
                Vec::new(),
                4096,
            ))),
            ContentCoding::Unsupported => return Err(DecodeError::Unsupported),
        };
        Ok(Self {
            coding,
            sink,
            produced: 0,
        })
    }

    pub fn coding(&self) -> ContentCoding {
        self.coding
    }

    /// Total decoded bytes handed out so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Feeds one chunk of the encoded body and returns what it decoded to.
    ///
    /// Fails with [`DecodeError::TooLarge`] as soon as this chunk alone has
    /// decoded to more than `limit` bytes.
    pub fn write(&mut self, chunk: &[u8], limit: u64) -> Result<Vec<u8>, DecodeError> {
        let mut out = Vec::new();
        for piece in chunk.chunks(FEED_SIZE) {
            self.feed(piece)?;
            let drained = self.drain();
            self.produced += drained.len() as u64;
            out.extend_from_slice(&drained);
            if out.len() as u64 > limit {
                return Err(DecodeError::TooLarge {
                    coding: self.coding.as_str(),
                    limit,
                });
            }
        }
        Ok(out)
    }

    /// Signals the end of the encoded body and returns the trailing output.
    pub fn finish(self) -> Result<Vec<u8>, DecodeError> {
        let coding = self.coding.as_str();
        let io = |source| DecodeError::Io { coding, source };
        match self.sink {
            Sink::Identity(buf) => Ok(buf),
            Sink::Gzip(decoder) => decoder.finish().map_err(io),
            Sink::Zlib(decoder) => decoder.finish().map_err(io),
            Sink::Deflate(decoder) => decoder.finish().map_err(io),
            // Fewer than two bytes cannot be a zlib stream.
            Sink::PendingDeflate(head) => {
                let mut decoder = write::DeflateDecoder::new(Vec::new());
                decoder.write_all(&head).map_err(io)?;
                decoder.finish().map_err(io)
            }
            Sink::Brotli(mut decoder) => {
                decoder.close().map_err(io)?;
                Ok(std::mem::take(decoder.get_mut()))
            }
        }
    }

    fn feed(&mut self, piece: &[u8]) -> Result<(), DecodeError> {
        let coding = self.coding.as_str();
        let io = |source| DecodeError::Io { coding, source };
        match &mut self.sink {
            Sink::Identity(buf) => buf.extend_from_slice(piece),
            // Flushing pushes out everything this piece inflated to.
            Sink::Gzip(decoder) => push(decoder, piece).map_err(io)?,
            Sink::Zlib(decoder) => push(decoder, piece).map_err(io)?,
            Sink::Deflate(decoder) => push(decoder, piece).map_err(io)?,
            Sink::Brotli(decoder) => push(decoder.as_mut(), piece).map_err(io)?,
            Sink::PendingDeflate(head) => {
                head.extend_from_slice(piece);
                if head.len() < 2 {
                    return Ok(());
                }
                let head = std::mem::take(head);
                // Servers disagree on whether "deflate" carries a zlib header.
                self.sink = if has_zlib_header(&head) {
                    let mut decoder = write::ZlibDecoder::new(Vec::new());
                    push(&mut decoder, &head).map_err(io)?;
                    Sink::Zlib(decoder)
                } else {
                    let mut decoder = write::DeflateDecoder::new(Vec::new());
                    push(&mut decoder, &head).map_err(io)?;
                    Sink::Deflate(decoder)
                };
            }
        }
        Ok(())
    }

    fn drain(&mut self) -> Vec<u8> {
        match &mut self.sink {
            Sink::Identity(buf) => std::mem::take(buf),
            Sink::Gzip(decoder) => std::mem::take(decoder.get_mut()),
            Sink::Zlib(decoder) => std::mem::take(decoder.get_mut()),
            Sink::Deflate(decoder) => std::mem::take(decoder.get_mut()),
            Sink::Brotli(decoder) => std::mem::take(decoder.get_mut()),
            Sink::PendingDeflate(_) => Vec::new(),
        }
    }
}

impl std::fmt::Debug for BodyDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyDecoder")
            .field("coding", &self.coding)
            .field("produced", &self.produced)
            .finish()
    }
}

fn push<W: Write>(decoder: &mut W, piece: &[u8]) -> std::io::Result<()> {
    decoder.write_all(piece)?;
    decoder.flush()
}

fn has_zlib_header(head: &[u8]) -> bool {
    match head {
        [cmf, flg, ..] => cmf & 0x0F == 8 && (u16::from(*cmf) << 8 | u16::from(*flg)) % 31 == 0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn classify_by_content_type() {
        assert_eq!(
            ContentKind::classify(Some("text/html; charset=utf-8"), "/"),
            ContentKind::Markup
        );
        assert_eq!(
            ContentKind::classify(Some("TEXT/CSS"), "/site.css"),
            ContentKind::Stylesheet
        );
        assert_eq!(
            ContentKind::classify(Some("application/vnd.apple.mpegurl"), "/live"),
            ContentKind::Playlist
        );
        assert_eq!(
            ContentKind::classify(Some("image/png"), "/logo.png"),
            ContentKind::Passthrough
        );
    }

    #[test]
    fn classify_playlist_by_extension() {
        assert_eq!(
            ContentKind::classify(Some("application/octet-stream"), "/v/index.M3U8"),
            ContentKind::Playlist
        );
        assert_eq!(ContentKind::classify(None, "/radio.m3u"), ContentKind::Playlist);
    }

    #[test]
    fn unknown_or_stacked_codings_are_unsupported() {
        assert_eq!(ContentCoding::from_header(None), ContentCoding::Identity);
        assert_eq!(ContentCoding::from_header(Some("GZIP")), ContentCoding::Gzip);
        assert_eq!(ContentCoding::from_header(Some("zstd")), ContentCoding::Unsupported);
        assert_eq!(
            ContentCoding::from_header(Some("gzip, br")),
            ContentCoding::Unsupported
        );
    }

    fn decode_all(coding: ContentCoding, body: &[u8], limit: u64) -> Result<Vec<u8>, DecodeError> {
        let mut decoder = BodyDecoder::new(coding)?;
        let mut out = decoder.write(body, limit)?;
        out.extend(decoder.finish()?);
        Ok(out)
    }

    fn gzip(body: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(body).unwrap();
        encoder.finish().unwrap()
    }

    //------------------------------------------------------------------------
    // Decoding
    //------------------------------------------------------------------------

    #[test]
    fn gzip_body_is_decoded() {
        // Arrange
        let compressed = gzip(b"<p>hello</p>");

        // Act
        let decoded = decode_all(ContentCoding::Gzip, &compressed, 1024).unwrap();

        // Assert
        assert_eq!(decoded, b"<p>hello</p>");
    }

    #[test]
    fn gzip_body_split_across_chunks_is_decoded() {
        // Arrange
        let body = "<li>item</li>".repeat(2000);
        let compressed = gzip(body.as_bytes());
        let mut decoder = BodyDecoder::new(ContentCoding::Gzip).unwrap();

        // Act
        let mut decoded = Vec::new();
        for chunk in compressed.chunks(7) {
            decoded.extend(decoder.write(chunk, 1 << 20).unwrap());
        }
        decoded.extend(decoder.finish().unwrap());

        // Assert
        assert_eq!(decoded, body.as_bytes());
    }

    #[test]
    fn brotli_body_is_decoded() {
        let mut compressed = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut compressed, 4096, 5, 22);
            writer.write_all(b"body { color: red }").unwrap();
        }

        let decoded = decode_all(ContentCoding::Brotli, &compressed, 1024).unwrap();

        assert_eq!(decoded, b"body { color: red }");
    }

    #[test]
    fn deflate_with_and_without_zlib_header_is_decoded() {
        let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
        zlib.write_all(b"wrapped").unwrap();
        let mut raw = DeflateEncoder::new(Vec::new(), Compression::default());
        raw.write_all(b"raw").unwrap();

        assert_eq!(
            decode_all(ContentCoding::Deflate, &zlib.finish().unwrap(), 1024).unwrap(),
            b"wrapped"
        );
        assert_eq!(
            decode_all(ContentCoding::Deflate, &raw.finish().unwrap(), 1024).unwrap(),
            b"raw"
        );
    }

    #[test]
    fn corrupt_gzip_is_an_error() {
        let err = decode_all(ContentCoding::Gzip, b"not gzip at all", 1024).unwrap_err();

        assert!(err.to_string().contains("gzip"));
    }

    #[test]
    fn unsupported_coding_has_no_decoder() {
        assert!(matches!(
            BodyDecoder::new(ContentCoding::Unsupported),
            Err(DecodeError::Unsupported)
        ));
    }

    //------------------------------------------------------------------------
    // Output limit
    //------------------------------------------------------------------------

    #[test]
    fn highly_compressed_body_stops_at_the_limit() {
        // Arrange
        let limit = 16 * 1024 * 1024;
        let compressed = gzip(&vec![b' '; 64 * 1024 * 1024]);
        let mut decoder = BodyDecoder::new(ContentCoding::Gzip).unwrap();

        // Act
        let err = decoder.write(&compressed, limit).unwrap_err();

        // Assert
        assert!(compressed.len() < 128 * 1024);
        assert!(matches!(err, DecodeError::TooLarge { coding: "gzip", .. }));
        assert!(decoder.produced() <= limit + 2 * 1024 * 1024);
    }

    #[test]
    fn limit_applies_to_each_chunk() {
        let mut decoder = BodyDecoder::new(ContentCoding::Identity).unwrap();

        assert_eq!(decoder.write(b"0123456789", 15).unwrap(), b"0123456789");
        assert_eq!(decoder.write(b"0123456789", 15).unwrap(), b"0123456789");
        let err = decoder.write(b"0123456789012345", 15).unwrap_err();

        assert!(matches!(err, DecodeError::TooLarge { limit: 15, .. }));
        assert_eq!(decoder.produced(), 36);
    }
}
