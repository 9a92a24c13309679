// Quite OK Audio codec core
// Copyright (c) 2023 Dominic Szablewski
// SPDX-License-Identifier: MIT

#![no_main]

use libfuzzer_sys::fuzz_target;
use qoaf::Descriptor;

// Encoding then decoding arbitrary sample data must never panic, and must
// reproduce the same sample count the descriptor was given.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let channels = (data[0] % 8) + 1;
    let rest = &data[1..];
    let samples: Vec<i16> = rest
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect();

    let frame_samples = samples.len() / channels as usize;
    if frame_samples == 0 {
        return;
    }
    let samples = &samples[..frame_samples * channels as usize];

    let mut desc = Descriptor::new(channels, 44100, frame_samples as u32);
    if let Some(encoded) = qoaf::encode(samples, &mut desc) {
        let (dec_desc, decoded) = qoaf::decode(&encoded).expect("encoder output must decode");
        assert_eq!(dec_desc.samples as usize, frame_samples);
        assert_eq!(decoded.len(), samples.len());
    }
});
