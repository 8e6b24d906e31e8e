// file: src/multipart.rs
// description: incremental parser for multipart/x-mixed-replace video streams

use crate::error::{Result, SurveillanceError};

/// Upper bound on bytes held while waiting for a part to complete.
pub const DEFAULT_MAX_BUFFER: usize = 8 * 1024 * 1024;

const HEADER_END: &[u8] = b"\r\n\r\n";

/// One complete part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    /// Looking for the next delimiter; anything before it is preamble or padding.
    Delimiter,
    Headers,
    Body {
        content_length: Option<usize>,
    },
    /// Closing delimiter seen.
    Done,
}

/// Feeds arbitrary chunks, yields complete parts as soon as they are available.
#[derive(Debug)]
pub struct MultipartReader {
    delimiter: Vec<u8>,
    buffer: Vec<u8>,
    state: ReadState,
    content_type: Option<String>,
    max_buffer: usize,
}

impl MultipartReader {
    pub fn new(boundary: &str) -> Self {
        Self::with_max_buffer(boundary, DEFAULT_MAX_BUFFER)
    }

    pub fn with_max_buffer(boundary: &str, max_buffer: usize) -> Self {
        let boundary = boundary.strip_prefix("--").unwrap_or(boundary);
        Self {
            delimiter: format!("--{boundary}").into_bytes(),
            buffer: Vec::new(),
            state: ReadState::Delimiter,
            content_type: None,
            max_buffer,
        }
    }

    /// True once the closing delimiter was read.
    pub fn is_finished(&self) -> bool {
        self.state == ReadState::Done
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Part>> {
        if self.state == ReadState::Done {
            return Ok(Vec::new());
        }
        self.buffer.extend_from_slice(chunk);

        let mut parts = Vec::new();
        while let Some(part) = self.advance()? {
            parts.push(part);
        }

        if self.buffer.len() > self.max_buffer {
            self.buffer.clear();
            return Err(SurveillanceError::InvalidMessage(format!(
                "multipart part exceeds {} bytes",
                self.max_buffer
            )));
        }
        Ok(parts)
    }

    /// Runs the state machine until it needs more input. Returns a part when one completes.
    fn advance(&mut self) -> Result<Option<Part>> {
        loop {
            match self.state {
                ReadState::Done => {
                    self.buffer.clear();
                    return Ok(None);
                }
                ReadState::Delimiter => {
                    let Some(pos) = find(&self.buffer, &self.delimiter) else {
                        // keep a tail that may hold the start of a split delimiter
                        let keep = self.delimiter.len().saturating_sub(1);
                        if self.buffer.len() > keep {
                            self.buffer.drain(..self.buffer.len() - keep);
                        }
                        return Ok(None);
                    };
                    self.buffer.drain(..pos + self.delimiter.len());
                    self.state = ReadState::Headers;
                }
                ReadState::Headers => {
                    if self.buffer.len() < 2 {
                        return Ok(None);
                    }
                    if self.buffer.starts_with(b"--") {
                        self.state = ReadState::Done;
                        continue;
                    }
                    let Some(end) = find(&self.buffer, HEADER_END) else {
                        return Ok(None);
                    };
                    let headers = String::from_utf8_lossy(&self.buffer[..end]).into_owned();
                    self.buffer.drain(..end + HEADER_END.len());

                    let (content_type, content_length) = parse_headers(&headers)?;
                    self.content_type = content_type;
                    self.state = ReadState::Body { content_length };
                }
                ReadState::Body {
                    content_length: Some(len),
                } => {
                    if self.buffer.len() < len {
                        return Ok(None);
                    }
                    let body: Vec<u8> = self.buffer.drain(..len).collect();
                    self.state = ReadState::Delimiter;
                    return Ok(Some(self.finish_part(body)));
                }
                ReadState::Body {
                    content_length: None,
                } => {
                    let Some(pos) = find(&self.buffer, &self.delimiter) else {
                        return Ok(None);
                    };
                    let mut body: Vec<u8> = self.buffer.drain(..pos).collect();
                    if body.ends_with(b"\r\n") {
                        body.truncate(body.len() - 2);
                    }
                    self.state = ReadState::Delimiter;
                    return Ok(Some(self.finish_part(body)));
                }
            }
        }
    }

    fn finish_part(&mut self, body: Vec<u8>) -> Part {
        Part {
            content_type: self.content_type.take(),
            body,
        }
    }
}

fn parse_headers(block: &str) -> Result<(Option<String>, Option<usize>)> {
    let mut content_type = None;
    let mut content_length = None;

    for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some((name, value)) = line.split_once(':') else {
            return Err(SurveillanceError::InvalidMessage(format!(
                "malformed part header: {line}"
            )));
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("content-length") {
            let len = value.parse::<usize>().map_err(|_| {
                SurveillanceError::InvalidMessage(format!("bad part content-length: {value}"))
            })?;
            content_length = Some(len);
        }
    }

    Ok((content_type, content_length))
}

/// Extracts the boundary of a `multipart/*` content type, `None` for anything else.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';').map(str::trim);
    let mime = params.next()?;
    if !mime.to_ascii_lowercase().starts_with("multipart/") {
        return None;
    }

    params
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|boundary| !boundary.is_empty())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg_part(body: &[u8]) -> Vec<u8> {
        let mut part = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
        part.extend_from_slice(body);
        part.extend_from_slice(b"\r\n");
        part
    }

    #[test]
    fn splits_parts_on_boundary() {
        let mut reader = MultipartReader::new("frame");
        let mut body = jpeg_part(b"first");
        body.extend(jpeg_part(b"second"));

        // the second part completes only once the next delimiter shows up
        let parts = reader.push(&body).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].body, b"first");
        assert_eq!(parts[0].content_type.as_deref(), Some("image/jpeg"));

        let parts = reader.push(b"--frame--\r\n").unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].body, b"second");
        assert!(reader.is_finished());
    }

    #[test]
    fn handles_chunks_split_anywhere() {
        let mut stream = Vec::new();
        for body in [&b"alpha"[..], b"beta", b"gamma"] {
            stream.extend(jpeg_part(body));
        }
        stream.extend_from_slice(b"--frame--");

        let mut reader = MultipartReader::new("frame");
        let mut bodies = Vec::new();
        for byte in stream.chunks(3) {
            for part in reader.push(byte).unwrap() {
                bodies.push(part.body);
            }
        }
        assert_eq!(bodies, vec![b"alpha".to_vec(), b"beta".to_vec(), b"gamma".to_vec()]);
    }

    #[test]
    fn honours_content_length() {
        let mut reader = MultipartReader::new("frame");
        // body contains the delimiter text, only the length tells where it ends
        let parts = reader
            .push(b"--frame\r\nContent-Length: 9\r\n\r\n--frame!!\r\n--frame\r\n")
            .unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].body, b"--frame!!");
        assert_eq!(parts[0].content_type, None);
    }

    #[test]
    fn skips_preamble() {
        let mut reader = MultipartReader::new("frame");
        let mut body = b"garbage before the first part\r\n".to_vec();
        body.extend(jpeg_part(b"x"));
        body.extend_from_slice(b"--frame--");
        let parts = reader.push(&body).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].body, b"x");
    }

    #[test]
    fn oversized_part_is_rejected() {
        let mut reader = MultipartReader::with_max_buffer("frame", 16);
        let result = reader.push(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n0123456789abcdef0123");
        assert!(matches!(result, Err(SurveillanceError::InvalidMessage(_))));
    }

    #[test]
    fn bad_content_length_is_rejected() {
        let mut reader = MultipartReader::new("frame");
        let result = reader.push(b"--frame\r\nContent-Length: lots\r\n\r\n");
        assert!(matches!(result, Err(SurveillanceError::InvalidMessage(_))));
    }

    #[test]
    fn boundary_extraction() {
        assert_eq!(
            boundary_from_content_type("multipart/x-mixed-replace; boundary=frame").as_deref(),
            Some("frame")
        );
        assert_eq!(
            boundary_from_content_type("Multipart/X-Mixed-Replace;Boundary=\"b1\"").as_deref(),
            Some("b1")
        );
        assert_eq!(boundary_from_content_type("image/jpeg"), None);
        assert_eq!(boundary_from_content_type("multipart/x-mixed-replace"), None);
    }
}
