//! Fuzz target: `codec::decode_request` into `GuiServer::on_incoming_message`
//!
//! Arbitrary bytes must never panic the decoder, and a request that does
//! decode must survive a second encode/decode pass byte-for-byte (trailing
//! garbage and non-canonical booleans are normalised by the first
//! pass). Every input is also pushed
//! through a live server so tree dispatch sees hostile paths and values.
//!
//! cargo fuzz run fuzz_request_decoder

#![no_main]

use std::sync::{Arc, OnceLock};

use bleremote::config::GuiConfig;
use bleremote::gui::{GuiBuilder, SharedGui};
use bleremote::handler::ValueCell;
use bleremote::protocol::codec;
use bleremote::protocol::{GuiServer, NullTransport};
use bleremote::value::Rgbw;
use libfuzzer_sys::fuzz_target;

fn server() -> &'static GuiServer<NullTransport> {
    static SERVER: OnceLock<GuiServer<NullTransport>> = OnceLock::new();
    SERVER.get_or_init(|| {
        let gui = SharedGui::new(
            GuiBuilder::new()
                .group("g")
                .range("r", -10, 10, ValueCell::shared(0))
                .radio("c", &["a", "b"], ValueCell::shared(0))
                .end_group()
                .text_field("t", ValueCell::shared(String::new()))
                .color_field("rgb", ValueCell::shared(Rgbw::OFF), "RGBW")
                .build(),
        );
        GuiServer::new(gui, Arc::new(NullTransport), &GuiConfig::default())
            .expect("default config is valid")
    })
}

fuzz_target!(|data: &[u8]| {
    if let Ok(req) = codec::decode_request(data) {
        // Floats may carry NaN payloads; compare bytes, not values.
        let canonical = codec::encode_request(req.request_id, &req.body);
        let again = codec::decode_request(&canonical).expect("canonical form decodes");
        assert_eq!(
            codec::encode_request(again.request_id, &again.body),
            canonical,
            "encode/decode must be stable"
        );
    }
    server().on_incoming_message(data);
});
