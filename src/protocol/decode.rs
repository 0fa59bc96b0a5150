//! Protocol message decoding

use super::constants::{auth, tags};
use super::message::{AuthenticationMessage, BackendMessage, ErrorFields, FieldDescription};
use bytes::{Bytes, BytesMut};
use std::io;

/// Maximum message length (1 GB), matching PostgreSQL's own `PQ_LARGE_MESSAGE_LIMIT`.
///
/// Any message whose length field exceeds this value is rejected before allocation
/// to prevent denial-of-service via crafted length headers.
const MAX_MESSAGE_LENGTH: usize = 1_073_741_824;

/// Decode a backend message from BytesMut without cloning
///
/// Decodes in-place from a mutable BytesMut buffer and returns the number
/// of bytes consumed. The caller must advance the buffer after calling this.
///
/// Tags this client does not interpret decode to [`BackendMessage::Unknown`]
/// with the body consumed by its advertised length; the caller decides
/// whether that is skippable (startup) or a protocol violation (mid-query).
///
/// # Returns
/// `Ok((msg, consumed))` - Message and number of bytes consumed
/// `Err(e)` - IO error if message is incomplete or invalid
pub fn decode_message(data: &mut BytesMut) -> io::Result<(BackendMessage, usize)> {
    if data.len() < 5 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "incomplete message header",
        ));
    }

    let tag = data[0];
    let len = i32::from_be_bytes([data[1], data[2], data[3], data[4]]) as usize;

    if len < 4 || len > MAX_MESSAGE_LENGTH {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "message length {} outside allowed range 4..={}",
                len, MAX_MESSAGE_LENGTH
            ),
        ));
    }

    if data.len() < len + 1 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "incomplete message body",
        ));
    }

    // Temporary slice covering the body, after the tag and length
    let msg_start = 5;
    let msg_end = len + 1;
    let msg_data = &data[msg_start..msg_end];

    let msg = match tag {
        tags::AUTHENTICATION => decode_authentication(msg_data)?,
        tags::BACKEND_KEY_DATA => decode_backend_key_data(msg_data)?,
        tags::BIND_COMPLETE => BackendMessage::BindComplete,
        tags::COMMAND_COMPLETE => decode_command_complete(msg_data)?,
        tags::DATA_ROW => decode_data_row(msg_data)?,
        tags::EMPTY_QUERY_RESPONSE => BackendMessage::EmptyQueryResponse,
        tags::ERROR_RESPONSE => BackendMessage::ErrorResponse(decode_error_fields(msg_data)?),
        tags::NEGOTIATE_PROTOCOL_VERSION => decode_negotiate_protocol_version(msg_data)?,
        tags::NO_DATA => BackendMessage::NoData,
        tags::NOTICE_RESPONSE => BackendMessage::NoticeResponse(decode_error_fields(msg_data)?),
        tags::PARAMETER_DESCRIPTION => decode_parameter_description(msg_data)?,
        tags::PARAMETER_STATUS => decode_parameter_status(msg_data)?,
        tags::PARSE_COMPLETE => BackendMessage::ParseComplete,
        tags::PORTAL_SUSPENDED => BackendMessage::PortalSuspended,
        tags::READY_FOR_QUERY => decode_ready_for_query(msg_data)?,
        tags::ROW_DESCRIPTION => decode_row_description(msg_data)?,
        other => BackendMessage::Unknown { tag: other },
    };

    Ok((msg, len + 1))
}

fn decode_authentication(data: &[u8]) -> io::Result<BackendMessage> {
    if data.len() < 4 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "auth type"));
    }
    let auth_type = i32::from_be_bytes([data[0], data[1], data[2], data[3]]);

    let auth_msg = match auth_type {
        auth::OK => AuthenticationMessage::Ok,
        auth::CLEARTEXT_PASSWORD => AuthenticationMessage::CleartextPassword,
        auth::MD5_PASSWORD => {
            if data.len() < 8 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "salt data"));
            }
            let mut salt = [0u8; 4];
            salt.copy_from_slice(&data[4..8]);
            AuthenticationMessage::Md5Password { salt }
        }
        auth::SASL => {
            // SASL: read mechanism list (null-terminated strings)
            let mut mechanisms = Vec::new();
            let remaining = &data[4..];
            let mut offset = 0;
            loop {
                if offset >= remaining.len() {
                    break;
                }
                match remaining[offset..].iter().position(|&b| b == 0) {
                    Some(end) => {
                        let mechanism =
                            String::from_utf8_lossy(&remaining[offset..offset + end]).to_string();
                        if mechanism.is_empty() {
                            break;
                        }
                        mechanisms.push(mechanism);
                        offset += end + 1;
                    }
                    None => break,
                }
            }
            AuthenticationMessage::Sasl { mechanisms }
        }
        auth::SASL_CONTINUE => AuthenticationMessage::SaslContinue {
            data: data[4..].to_vec(),
        },
        auth::SASL_FINAL => AuthenticationMessage::SaslFinal {
            data: data[4..].to_vec(),
        },
        code => AuthenticationMessage::Other { code },
    };

    Ok(BackendMessage::Authentication(auth_msg))
}

fn decode_backend_key_data(data: &[u8]) -> io::Result<BackendMessage> {
    if data.len() < 8 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "backend key data",
        ));
    }
    let process_id = i32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    let secret_key = i32::from_be_bytes([data[4], data[5], data[6], data[7]]);
    Ok(BackendMessage::BackendKeyData {
        process_id,
        secret_key,
    })
}

fn decode_command_complete(data: &[u8]) -> io::Result<BackendMessage> {
    let end = data.iter().position(|&b| b == 0).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "missing null terminator in string",
        )
    })?;
    let tag = String::from_utf8_lossy(&data[..end]).to_string();
    Ok(BackendMessage::CommandComplete(tag))
}

fn decode_data_row(data: &[u8]) -> io::Result<BackendMessage> {
    if data.len() < 2 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "field count"));
    }
    let field_count = i16::from_be_bytes([data[0], data[1]]) as usize;
    let mut fields = Vec::with_capacity(field_count);
    let mut offset = 2;

    for _ in 0..field_count {
        if offset + 4 > data.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "field length"));
        }
        let field_len = i32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]);
        offset += 4;

        let field = if field_len == -1 {
            None
        } else {
            let len = field_len as usize;
            if offset + len > data.len() {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "field data"));
            }
            let field_bytes = Bytes::copy_from_slice(&data[offset..offset + len]);
            offset += len;
            Some(field_bytes)
        };
        fields.push(field);
    }

    Ok(BackendMessage::DataRow(fields))
}

fn decode_negotiate_protocol_version(data: &[u8]) -> io::Result<BackendMessage> {
    if data.len() < 4 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "negotiate version",
        ));
    }
    let newest_minor = i32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    Ok(BackendMessage::NegotiateProtocolVersion { newest_minor })
}

fn decode_parameter_description(data: &[u8]) -> io::Result<BackendMessage> {
    if data.len() < 2 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "param count"));
    }
    let count = i16::from_be_bytes([data[0], data[1]]) as usize;
    let mut oids = Vec::with_capacity(count);
    let mut offset = 2;
    for _ in 0..count {
        if offset + 4 > data.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "param oid"));
        }
        oids.push(u32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]));
        offset += 4;
    }
    Ok(BackendMessage::ParameterDescription(oids))
}

/// Decode the `(code byte, c-string)* NUL` body shared by ErrorResponse and
/// NoticeResponse. The surfaced codes are S, M, D, H, W, s, t, c, d, n;
/// every other code is consumed and dropped.
fn decode_error_fields(data: &[u8]) -> io::Result<ErrorFields> {
    let mut fields = ErrorFields::default();
    let mut offset = 0;

    loop {
        if offset >= data.len() {
            break;
        }
        let field_type = data[offset];
        offset += 1;
        if field_type == 0 {
            break;
        }

        let end = data[offset..].iter().position(|&b| b == 0).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "missing null terminator in error field",
            )
        })?;
        let value = String::from_utf8_lossy(&data[offset..offset + end]).to_string();
        offset += end + 1;

        match field_type {
            b'S' => fields.severity = Some(value),
            b'M' => fields.message = Some(value),
            b'D' => fields.detail = Some(value),
            b'H' => fields.hint = Some(value),
            b'W' => fields.where_ = Some(value),
            b's' => fields.schema = Some(value),
            b't' => fields.table = Some(value),
            b'c' => fields.column = Some(value),
            b'd' => fields.data_type = Some(value),
            b'n' => fields.constraint = Some(value),
            _ => {} // Consumed, not surfaced
        }
    }

    Ok(fields)
}

fn decode_parameter_status(data: &[u8]) -> io::Result<BackendMessage> {
    let mut offset = 0;

    let name_end = data[offset..].iter().position(|&b| b == 0).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "missing null terminator in parameter name",
        )
    })?;
    let name = String::from_utf8_lossy(&data[offset..offset + name_end]).to_string();
    offset += name_end + 1;

    if offset >= data.len() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "parameter value",
        ));
    }
    let value_end = data[offset..].iter().position(|&b| b == 0).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "missing null terminator in parameter value",
        )
    })?;
    let value = String::from_utf8_lossy(&data[offset..offset + value_end]).to_string();

    Ok(BackendMessage::ParameterStatus { name, value })
}

fn decode_ready_for_query(data: &[u8]) -> io::Result<BackendMessage> {
    if data.is_empty() {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "status byte"));
    }
    let status = data[0];
    Ok(BackendMessage::ReadyForQuery { status })
}

fn decode_row_description(data: &[u8]) -> io::Result<BackendMessage> {
    if data.len() < 2 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "field count"));
    }
    let field_count = i16::from_be_bytes([data[0], data[1]]) as usize;
    let mut fields = Vec::with_capacity(field_count);
    let mut offset = 2;

    for _ in 0..field_count {
        // Read name (null-terminated string)
        let name_end = data[offset..].iter().position(|&b| b == 0).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "missing null terminator in field name",
            )
        })?;
        let name = String::from_utf8_lossy(&data[offset..offset + name_end]).to_string();
        offset += name_end + 1;

        // Read field descriptor (18 bytes: 4+2+4+2+4+2)
        if offset + 18 > data.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "field descriptor",
            ));
        }
        let table_oid = i32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]);
        offset += 4;
        let column_attr = i16::from_be_bytes([data[offset], data[offset + 1]]);
        offset += 2;
        let type_oid = i32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]) as u32;
        offset += 4;
        let type_size = i16::from_be_bytes([data[offset], data[offset + 1]]);
        offset += 2;
        let type_modifier = i32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]);
        offset += 4;
        let format_code = i16::from_be_bytes([data[offset], data[offset + 1]]);
        offset += 2;

        fields.push(FieldDescription {
            name,
            table_oid,
            column_attr,
            type_oid,
            type_size,
            type_modifier,
            format_code,
        });
    }

    Ok(BackendMessage::RowDescription(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_authentication_ok() {
        let mut data = BytesMut::from(
            &[
                b'R', // Authentication
                0, 0, 0, 8, // Length = 8
                0, 0, 0, 0, // Auth OK
            ][..],
        );

        let (msg, consumed) = decode_message(&mut data).unwrap();
        match msg {
            BackendMessage::Authentication(AuthenticationMessage::Ok) => {}
            _ => panic!("expected Authentication::Ok"),
        }
        assert_eq!(consumed, 9); // 1 tag + 4 len + 4 auth type
    }

    #[test]
    fn test_decode_authentication_unsupported_subcode() {
        let mut data = BytesMut::from(&[b'R', 0, 0, 0, 8, 0, 0, 0, 7][..]);
        let (msg, _) = decode_message(&mut data).unwrap();
        match msg {
            BackendMessage::Authentication(AuthenticationMessage::Other { code }) => {
                assert_eq!(code, 7)
            }
            other => panic!("expected Other, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_oversized_message() {
        // Length field = MAX_MESSAGE_LENGTH + 1 (as i32 big-endian)
        let oversized_len = (super::MAX_MESSAGE_LENGTH as i32) + 1;
        let len_bytes = oversized_len.to_be_bytes();
        let mut data =
            BytesMut::from(&[b'D', len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]][..]);

        let err = decode_message(&mut data).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("outside allowed range"));
    }

    #[test]
    fn test_decode_rejects_undersized_length() {
        // A length below 4 cannot include the length field itself
        let mut data = BytesMut::from(&[b'D', 0, 0, 0, 2, 0, 0][..]);
        let err = decode_message(&mut data).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_decode_ready_for_query() {
        let mut data = BytesMut::from(
            &[
                b'Z', // ReadyForQuery
                0, 0, 0, 5,    // Length = 5
                b'I', // Idle
            ][..],
        );

        let (msg, consumed) = decode_message(&mut data).unwrap();
        match msg {
            BackendMessage::ReadyForQuery { status } => assert_eq!(status, b'I'),
            _ => panic!("expected ReadyForQuery"),
        }
        assert_eq!(consumed, 6); // 1 tag + 4 len + 1 status
    }

    #[test]
    fn test_decode_parse_and_bind_complete() {
        let mut data = BytesMut::from(&[b'1', 0, 0, 0, 4, b'2', 0, 0, 0, 4][..]);

        let (msg, consumed) = decode_message(&mut data).unwrap();
        assert!(matches!(msg, BackendMessage::ParseComplete));
        let _ = data.split_to(consumed);

        let (msg, _) = decode_message(&mut data).unwrap();
        assert!(matches!(msg, BackendMessage::BindComplete));
    }

    #[test]
    fn test_decode_parameter_description() {
        // 2 params: int4 (23), text (25)
        let mut data =
            BytesMut::from(&[b't', 0, 0, 0, 14, 0, 2, 0, 0, 0, 23, 0, 0, 0, 25][..]);
        let (msg, _) = decode_message(&mut data).unwrap();
        match msg {
            BackendMessage::ParameterDescription(oids) => assert_eq!(oids, vec![23, 25]),
            other => panic!("expected ParameterDescription, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_no_data() {
        let mut data = BytesMut::from(&[b'n', 0, 0, 0, 4][..]);
        let (msg, _) = decode_message(&mut data).unwrap();
        assert!(matches!(msg, BackendMessage::NoData));
    }

    #[test]
    fn test_decode_data_row_with_null() {
        // 2 fields: null (-1), then "7"
        let mut body = vec![0u8, 2];
        body.extend_from_slice(&(-1i32).to_be_bytes());
        body.extend_from_slice(&1i32.to_be_bytes());
        body.push(b'7');

        let mut data = BytesMut::new();
        data.extend_from_slice(&[b'D']);
        data.extend_from_slice(&((4 + body.len()) as i32).to_be_bytes());
        data.extend_from_slice(&body);

        let (msg, _) = decode_message(&mut data).unwrap();
        match msg {
            BackendMessage::DataRow(fields) => {
                assert_eq!(fields.len(), 2);
                assert!(fields[0].is_none());
                assert_eq!(fields[1].as_deref(), Some(&b"7"[..]));
            }
            other => panic!("expected DataRow, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_tag_skips_by_length() {
        // Tag '@' with a 3-byte body, followed by ReadyForQuery
        let mut data = BytesMut::from(
            &[b'@', 0, 0, 0, 7, 1, 2, 3, b'Z', 0, 0, 0, 5, b'I'][..],
        );

        let (msg, consumed) = decode_message(&mut data).unwrap();
        match msg {
            BackendMessage::Unknown { tag } => assert_eq!(tag, b'@'),
            other => panic!("expected Unknown, got {:?}", other),
        }
        assert_eq!(consumed, 8);
        let _ = data.split_to(consumed);

        let (msg, _) = decode_message(&mut data).unwrap();
        assert!(matches!(msg, BackendMessage::ReadyForQuery { .. }));
    }

    #[test]
    fn test_decode_error_fields_surfaced_codes() {
        // S M W s t c d n surfaced; C (code) and P (position) consumed but dropped
        let mut body = Vec::new();
        for (code, value) in [
            (b'S', "ERROR"),
            (b'C', "42601"),
            (b'M', "syntax error"),
            (b'W', "PL/pgSQL function f() line 3"),
            (b's', "public"),
            (b't', "widgets"),
            (b'c', "mass"),
            (b'd', "numeric"),
            (b'n', "widgets_mass_check"),
            (b'P', "12"),
        ] {
            body.push(code);
            body.extend_from_slice(value.as_bytes());
            body.push(0);
        }
        body.push(0);

        let fields = decode_error_fields(&body).unwrap();
        assert_eq!(fields.severity.as_deref(), Some("ERROR"));
        assert_eq!(fields.message.as_deref(), Some("syntax error"));
        assert_eq!(
            fields.where_.as_deref(),
            Some("PL/pgSQL function f() line 3")
        );
        assert_eq!(fields.schema.as_deref(), Some("public"));
        assert_eq!(fields.table.as_deref(), Some("widgets"));
        assert_eq!(fields.column.as_deref(), Some("mass"));
        assert_eq!(fields.data_type.as_deref(), Some("numeric"));
        assert_eq!(fields.constraint.as_deref(), Some("widgets_mass_check"));
    }

    #[test]
    fn test_decode_row_description_single_column() {
        let mut body = vec![0u8, 1];
        body.extend_from_slice(b"a\0");
        body.extend_from_slice(&0i32.to_be_bytes()); // table oid
        body.extend_from_slice(&0i16.to_be_bytes()); // column attr
        body.extend_from_slice(&23i32.to_be_bytes()); // type oid int4
        body.extend_from_slice(&4i16.to_be_bytes()); // type size
        body.extend_from_slice(&(-1i32).to_be_bytes()); // type modifier
        body.extend_from_slice(&0i16.to_be_bytes()); // format code

        let mut data = BytesMut::new();
        data.extend_from_slice(&[b'T']);
        data.extend_from_slice(&((4 + body.len()) as i32).to_be_bytes());
        data.extend_from_slice(&body);

        let (msg, _) = decode_message(&mut data).unwrap();
        match msg {
            BackendMessage::RowDescription(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].name, "a");
                assert_eq!(fields[0].type_oid, 23);
                assert_eq!(fields[0].format_code, 0);
            }
            other => panic!("expected RowDescription, got {:?}", other),
        }
    }
}
