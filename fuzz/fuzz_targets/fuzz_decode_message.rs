#![no_main]

use bytes::{BufMut, BytesMut};
use cassis_wire::protocol::decode_message;
use libfuzzer_sys::fuzz_target;

// Every tag this client decodes, plus one it does not ('@'), so the
// unknown-tag skip path runs too. The extended-protocol responses
// (ParameterDescription, ParseComplete, BindComplete, PortalSuspended,
// NoData, NegotiateProtocolVersion) have their own body parsers and get
// the fuzz bytes as a body below.
const TAGS: &[u8] = b"RK12CDEInNStsZTv@";

fuzz_target!(|data: &[u8]| {
    // Raw stream: arbitrary bytes drained frame by frame, as if several
    // messages arrived in one TCP segment.
    let mut buf = BytesMut::from(data);
    while !buf.is_empty() {
        match decode_message(&mut buf) {
            Ok((_, consumed)) => {
                // A frame is at least tag + length, never past the buffer
                assert!(consumed >= 5);
                assert!(consumed <= buf.len());
                let _ = buf.split_to(consumed);
            }
            Err(_) => break,
        }
    }

    // Re-framed stream: the same bytes as the body of each message kind
    // under a well-formed header, so the per-tag parsers (DataRow field
    // lengths, RowDescription descriptors, ParameterDescription OID
    // lists, error/notice fields) run even when the input carries no
    // valid framing of its own.
    for &tag in TAGS {
        let mut framed = BytesMut::with_capacity(data.len() + 5);
        framed.put_u8(tag);
        framed.put_i32(4 + data.len() as i32);
        framed.put_slice(data);

        let full = framed.len();
        // Complete frame, then two truncations: short reads must fail
        // cleanly, never panic or consume past what they were given.
        for end in [full, full.saturating_sub(1).max(5), 5 + data.len() / 2] {
            let end = end.min(full);
            let mut partial = BytesMut::from(&framed[..end]);
            if let Ok((_, consumed)) = decode_message(&mut partial) {
                assert!(consumed <= end);
            }
        }
    }
});
