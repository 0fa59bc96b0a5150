//! Protocol message encoding

use super::message::FrontendMessage;
use bytes::{BufMut, BytesMut};

/// Encode a frontend message into bytes
pub fn encode_message(msg: &FrontendMessage) -> BytesMut {
    let mut buf = BytesMut::new();
    encode_into(msg, &mut buf);
    buf
}

/// Encode several frontend messages into one buffer.
///
/// Used for the extended-protocol pipeline (Bind + Execute + Sync) so that
/// a batch reaches the socket in a single flush.
pub fn encode_batch(msgs: &[FrontendMessage]) -> BytesMut {
    let mut buf = BytesMut::new();
    for msg in msgs {
        encode_into(msg, &mut buf);
    }
    buf
}

/// Encode one message, appending to `buf`
pub fn encode_into(msg: &FrontendMessage, buf: &mut BytesMut) {
    match msg {
        FrontendMessage::Startup { version, params } => {
            encode_startup(buf, *version, params);
        }
        FrontendMessage::Password(password) => {
            encode_cstring_message(buf, b'p', password);
        }
        FrontendMessage::Query(query) => {
            encode_cstring_message(buf, b'Q', query);
        }
        FrontendMessage::Parse {
            name,
            sql,
            param_types,
        } => {
            encode_parse(buf, name, sql, param_types);
        }
        FrontendMessage::Bind {
            portal,
            statement,
            params,
        } => {
            encode_bind(buf, portal, statement, params);
        }
        FrontendMessage::Describe { kind, name } => {
            encode_describe(buf, *kind, name);
        }
        FrontendMessage::Execute { portal, max_rows } => {
            encode_execute(buf, portal, *max_rows);
        }
        FrontendMessage::Sync => {
            buf.put_u8(b'S');
            buf.put_i32(4);
        }
        FrontendMessage::Terminate => {
            buf.put_u8(b'X');
            buf.put_i32(4);
        }
        FrontendMessage::SaslInitialResponse { mechanism, data } => {
            encode_sasl_initial_response(buf, mechanism, data);
        }
        FrontendMessage::SaslResponse { data } => {
            buf.put_u8(b'p');
            with_length(buf, |buf| buf.put_slice(data));
        }
        FrontendMessage::SslRequest => {
            buf.put_i32(8);
            buf.put_i32(super::constants::SSL_REQUEST_CODE);
        }
    }
}

/// Reserve the length field, run `body`, then back-patch the length
/// (which includes the length field itself, not the tag).
fn with_length<F: FnOnce(&mut BytesMut)>(buf: &mut BytesMut, body: F) {
    let len_pos = buf.len();
    buf.put_i32(0);
    body(buf);
    let len = buf.len() - len_pos;
    buf[len_pos..len_pos + 4].copy_from_slice(&(len as i32).to_be_bytes());
}

fn put_cstring(buf: &mut BytesMut, s: &str) {
    buf.put(s.as_bytes());
    buf.put_u8(0);
}

fn encode_startup(buf: &mut BytesMut, version: i32, params: &[(String, String)]) {
    // Startup messages don't have a type byte
    with_length(buf, |buf| {
        buf.put_i32(version);
        for (key, value) in params {
            put_cstring(buf, key);
            put_cstring(buf, value);
        }
        // Final null terminator
        buf.put_u8(0);
    });
}

fn encode_cstring_message(buf: &mut BytesMut, tag: u8, body: &str) {
    buf.put_u8(tag);
    with_length(buf, |buf| put_cstring(buf, body));
}

fn encode_parse(buf: &mut BytesMut, name: &str, sql: &str, param_types: &[u32]) {
    buf.put_u8(b'P');
    with_length(buf, |buf| {
        put_cstring(buf, name);
        put_cstring(buf, sql);
        buf.put_i16(param_types.len() as i16);
        for oid in param_types {
            buf.put_u32(*oid);
        }
    });
}

fn encode_bind(buf: &mut BytesMut, portal: &str, statement: &str, params: &[Option<String>]) {
    buf.put_u8(b'B');
    with_length(buf, |buf| {
        put_cstring(buf, portal);
        put_cstring(buf, statement);

        // Zero parameter format codes: everything is text
        buf.put_i16(0);

        // Parameter values: 4-byte length then body; -1 length marks null
        buf.put_i16(params.len() as i16);
        for param in params {
            match param {
                Some(text) => {
                    buf.put_i32(text.len() as i32);
                    buf.put_slice(text.as_bytes());
                }
                None => buf.put_i32(-1),
            }
        }

        // Zero result format codes: all columns come back as text
        buf.put_i16(0);
    });
}

fn encode_describe(buf: &mut BytesMut, kind: u8, name: &str) {
    buf.put_u8(b'D');
    with_length(buf, |buf| {
        buf.put_u8(kind);
        put_cstring(buf, name);
    });
}

fn encode_execute(buf: &mut BytesMut, portal: &str, max_rows: i32) {
    buf.put_u8(b'E');
    with_length(buf, |buf| {
        put_cstring(buf, portal);
        buf.put_i32(max_rows);
    });
}

fn encode_sasl_initial_response(buf: &mut BytesMut, mechanism: &str, data: &[u8]) {
    buf.put_u8(b'p');
    with_length(buf, |buf| {
        // Mechanism name (null-terminated)
        put_cstring(buf, mechanism);
        // SASL data (length-prefixed bytes, no terminator)
        buf.put_i32(data.len() as i32);
        buf.put_slice(data);
    });
}
