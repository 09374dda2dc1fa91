//! Fuzz target: `protocol::decode`
//!
//! Drives arbitrary bytes through the tokenizer and shape validator and
//! asserts that decoding never panics and that anything accepted is
//! internally consistent.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use fsueye::bus::ServiceId;
use fsueye::kvs::KVS_MAX_VALUE_SIZE;
use fsueye::protocol::{decode, tokenizer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(tokens) = tokenizer::tokenize(data) {
        assert!(tokens.len() <= tokenizer::MAX_TOKENS);
        for t in &tokens {
            assert!(t.start <= t.end && t.end <= data.len());
        }
    }

    if let Ok(cmd) = decode(data, "fuzz") {
        assert_ne!(cmd.command, 0, "command 0 must never decode");
        match (cmd.service, &cmd.kvs) {
            (ServiceId::Kvs, Some(entry)) => assert!(entry.len() <= KVS_MAX_VALUE_SIZE),
            (ServiceId::Kvs, None) => panic!("KVS command without payload"),
            (_, Some(_)) => panic!("payload on non-KVS command"),
            (_, None) => {}
        }
    }
});
