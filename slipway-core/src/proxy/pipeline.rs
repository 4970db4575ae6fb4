use crate::ctx::{RequestCtx, ResponseRoute};
use crate::engine::redirect::is_redirect;
use crate::engine::{BodyDecoder, ContentCoding, ContentKind, DecodeError, rewrite_body};
use bytes::Bytes;
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, Method, StatusCode, Uri};
use pingora_http::{RequestHeader, ResponseHeader};
use url::Url;

/// Decides what to do with the upstream body once its headers are in.
///
/// `HEAD` is planned like `GET` so both get the same response headers.
pub(crate) fn plan_response(
    status: StatusCode,
    headers: &HeaderMap,
    target: &Url,
    max_rewrite_bytes: u64,
) -> ResponseRoute {
    if is_redirect(status) && headers.contains_key(LOCATION) {
        return ResponseRoute::Redirect;
    }

    let has_body = status != StatusCode::NO_CONTENT
        && status != StatusCode::NOT_MODIFIED
        && !status.is_informational();
    if !has_body {
        return ResponseRoute::Passthrough;
    }

    let kind = ContentKind::classify(header_str(headers, CONTENT_TYPE), target.path());
    if !kind.is_rewritten() {
        return ResponseRoute::Passthrough;
    }

    let coding = ContentCoding::from_header(header_str(headers, CONTENT_ENCODING));
    if coding == ContentCoding::Unsupported {
        tracing::debug!(
            encoding = header_str(headers, CONTENT_ENCODING).unwrap_or_default(),
            "unsupported content encoding, streaming unmodified"
        );
        return ResponseRoute::Passthrough;
    }

    let announced = header_str(headers, CONTENT_LENGTH).and_then(|v| v.trim().parse::<u64>().ok());
    if announced.is_some_and(|len| len > max_rewrite_bytes) {
        tracing::debug!(
            content_length = announced,
            max_rewrite_bytes,
            "body too large to rewrite, streaming unmodified"
        );
        return ResponseRoute::Passthrough;
    }

    ResponseRoute::Rewrite { kind, coding }
}

/// Decoder for a body about to be buffered, if it is encoded and exists.
pub(crate) fn body_decoder(
    method: &Method,
    route: ResponseRoute,
) -> Result<Option<BodyDecoder>, DecodeError> {
    match route {
        ResponseRoute::Rewrite { coding, .. }
            if *method != Method::HEAD && coding != ContentCoding::Identity =>
        {
            BodyDecoder::new(coding).map(Some)
        }
        _ => Ok(None),
    }
}

/// Runs one upstream body chunk through the planned route and returns what
/// goes downstream now.
///
/// A rewrite buffers decoded bytes until end of stream. Once the decoded or
/// encoded buffer outgrows `limit`, what was decoded so far is flushed and the
/// rest is streamed: unmodified for identity bodies, decoded otherwise.
/// `limit` also caps what a single chunk may decode to.
pub(crate) fn filter_body(
    ctx: &mut RequestCtx,
    chunk: Option<Bytes>,
    end_of_stream: bool,
    limit: u64,
) -> Result<Option<Bytes>, DecodeError> {
    match ctx.route {
        ResponseRoute::Passthrough => Ok(chunk),
        ResponseRoute::Redirect => Ok(None),
        ResponseRoute::Rewrite { kind, .. } => {
            Ok(buffer_for_rewrite(ctx, kind, chunk, end_of_stream, limit))
        }
        ResponseRoute::Decode { .. } => stream_decoded(ctx, chunk, end_of_stream, limit),
    }
}

fn buffer_for_rewrite(
    ctx: &mut RequestCtx,
    kind: ContentKind,
    chunk: Option<Bytes>,
    end_of_stream: bool,
    limit: u64,
) -> Option<Bytes> {
    if ctx.method == Method::HEAD {
        return chunk;
    }

    if let Some(chunk) = chunk {
        match ctx.decoder.as_mut() {
            None => ctx.body.extend_from_slice(&chunk),
            Some(decoder) => {
                ctx.raw.extend_from_slice(&chunk);
                match decoder.write(&chunk, limit) {
                    Ok(decoded) => ctx.body.extend_from_slice(&decoded),
                    Err(e) => return Some(forward_as_received(ctx, kind, e)),
                }
            }
        }
    }

    if end_of_stream {
        if let Some(decoder) = ctx.decoder.take() {
            match decoder.finish() {
                Ok(tail) => ctx.body.extend_from_slice(&tail),
                Err(e) => return Some(forward_as_received(ctx, kind, e)),
            }
        }
        ctx.raw.clear();
        let decoded = ctx.body.split().freeze();
        return Some(match ctx.rewrite.as_ref() {
            Some(rewrite) => rewrite_body(kind, decoded, rewrite),
            None => decoded,
        });
    }

    if ctx.body.len() as u64 > limit || ctx.raw.len() as u64 > limit {
        ctx.route = match ctx.decoder.as_ref() {
            Some(decoder) => ResponseRoute::Decode {
                coding: decoder.coding(),
            },
            None => ResponseRoute::Passthrough,
        };
        tracing::debug!(
            request_id = %ctx.request_id,
            buffered = ctx.body.len(),
            route = ctx.route.as_str(),
            "body exceeded rewrite limit, streaming without rewriting"
        );
        ctx.raw.clear();
        return Some(ctx.body.split().freeze());
    }

    None
}

/// Gives up on the rewrite and hands back the encoded bytes seen so far.
fn forward_as_received(ctx: &mut RequestCtx, kind: ContentKind, e: DecodeError) -> Bytes {
    tracing::warn!(
        request_id = %ctx.request_id,
        error = %e,
        kind = kind.as_str(),
        "body could not be decoded, forwarding as received"
    );
    ctx.decoder = None;
    ctx.body.clear();
    ctx.route = ResponseRoute::Passthrough;
    ctx.raw.split().freeze()
}

fn stream_decoded(
    ctx: &mut RequestCtx,
    chunk: Option<Bytes>,
    end_of_stream: bool,
    limit: u64,
) -> Result<Option<Bytes>, DecodeError> {
    let Some(decoder) = ctx.decoder.as_mut() else {
        return Ok(chunk);
    };
    let mut out = match chunk {
        Some(chunk) => decoder.write(&chunk, limit)?,
        None => Vec::new(),
    };
    if end_of_stream {
        if let Some(decoder) = ctx.decoder.take() {
            out.extend(decoder.finish()?);
        }
    }
    Ok(Some(Bytes::from(out)))
}

/// Origin-form request target (`/path?query`) for the destination.
pub(crate) fn upstream_uri(target: &Url) -> Result<Uri, http::uri::InvalidUri> {
    let path_and_query = match target.query() {
        Some(query) => format!("{}?{}", target.path(), query),
        None => target.path().to_string(),
    };
    path_and_query.parse()
}

pub(crate) fn replace_request_headers(
    req: &mut RequestHeader,
    headers: HeaderMap,
) -> pingora::Result<()> {
    let existing: Vec<_> = req.headers.keys().cloned().collect();
    for name in &existing {
        req.remove_header(name);
    }
    for (name, value) in headers.iter() {
        req.append_header(name.clone(), value.clone())?;
    }
    Ok(())
}

pub(crate) fn replace_response_headers(
    resp: &mut ResponseHeader,
    headers: HeaderMap,
) -> pingora::Result<()> {
    let existing: Vec<_> = resp.headers.keys().cloned().collect();
    for name in &existing {
        resp.remove_header(name);
    }
    for (name, value) in headers.iter() {
        resp.append_header(name.clone(), value.clone())?;
    }
    Ok(())
}

fn header_str(headers: &HeaderMap, name: http::header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
