// Quite OK Audio codec core
// Copyright (c) 2023 Dominic Szablewski
// SPDX-License-Identifier: MIT

#![no_main]

use libfuzzer_sys::fuzz_target;
use qoaf::{frame, Descriptor};

// Exercises `decode_frame` directly, with the channel count drawn from the
// fuzz input itself, to reach code paths a full-file fuzz run might not hit
// (e.g. a channel count the file header never produces but that a streaming
// caller of `decode_frame` could still pass in).
fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let channels = (data[0] % 8) + 1;
    let mut desc = Descriptor::new(channels, 44100, u32::MAX);
    let mut out = vec![0i16; frame::FRAME_LEN * channels as usize];

    let _ = frame::decode_frame(&data[1..], &mut desc, &mut out);
});
