#![no_main]

use libfuzzer_sys::fuzz_target;
use mcpconform_core::jsonrpc::JsonRpcMessage;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes from stdio or an HTTP body land here verbatim;
    // parsing must never panic regardless of what a misbehaving or
    // adversarial server sends.
    let _: Result<JsonRpcMessage, _> = serde_json::from_slice(data);
});
