//! Shared fixtures for integration tests.
#![allow(dead_code)]

use heka_matcher::{decode, Message};

pub const PAYLOAD: &str = "Test Payload with a longer string to attempt to create a difference in \
pattern match time versus the string literal match time for a unique-item";

pub const FIXTURE_UUID: [u8; 16] = [
    0x23, 0x00, 0x81, 0xdc, 0x32, 0x6f, 0x4e, 0x3f, 0x9a, 0x5a, 0x93, 0x86, 0xa3, 0x7e, 0x24, 0x6f,
];

pub const FIXTURE_TIMESTAMP: i64 = 1_428_773_426_113_040_228;

/// The reference message: headers plus fields foo, number, bytes, int,
/// double, bool, a second foo, Payload, Timestamp, zero and string.
pub fn fixture_bytes() -> Vec<u8> {
    [
        &b"\x0a\x10\x23\x00\x81\xdc\x32\x6f\x4e\x3f\x9a\x5a\x93\x86\xa3\x7e\x24\x6f\
\x10\xe4\x9e\xf1\xff\xc6\xbb\x81\xea\x13\
\x1a\x04TEST\
\x22\x06GoSpec\
\x28\x06\
\x32\x90\x01"[..],
        PAYLOAD.as_bytes(),
        &b"\x3a\x030.8\
\x40\x9d\xfb\x01\
\x4a\x0atrink-x230\
\x52\x0c\x0a\x03foo\x10\x00\x22\x03bar\
\x52\x0d\x0a\x06number\x10\x02\x32\x01\x40\
\x52\x0f\x0a\x05bytes\x10\x01\x2a\x04data\
\x52\x0d\x0a\x03int\x10\x02\x32\x04\xe7\x07\x80\x08\
\x52\x14\x0a\x06double\x10\x03\x3a\x08\x9a\x99\x99\x99\x99\xf9\x58\x40\
\x52\x0b\x0a\x04bool\x10\x04\x42\x01\x01\
\x52\x12\x0a\x03foo\x10\x00\x22\x09alternate\
\x52\x20\x0a\x07Payload\x10\x00\x22\x13name=test;type=web;\
\x52\x38\x0a\x09Timestamp\x10\x00\x1a\x09date-time\x22\x1eMon Jan 02 15:04:05 -0700 2006\
\x52\x0b\x0a\x04zero\x10\x02\x32\x01\x00\
\x52\x0e\x0a\x06string\x10\x00\x22\x0243"[..],
    ]
    .concat()
}

/// Only the required headers: uuid and a zero timestamp.
pub fn minimal_bytes() -> Vec<u8> {
    b"\x0a\x10\x23\x00\x81\xdc\x32\x6f\x4e\x3f\x9a\x5a\x93\x86\xa3\x7e\x24\x6f\x10\x00".to_vec()
}

pub fn fixture() -> Message {
    decode(&fixture_bytes()).expect("fixture decodes")
}

pub fn minimal() -> Message {
    decode(&minimal_bytes()).expect("minimal fixture decodes")
}
