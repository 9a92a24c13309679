// Quite OK Audio codec core
// Copyright (c) 2023 Dominic Szablewski
// SPDX-License-Identifier: MIT

#![no_main]

use libfuzzer_sys::fuzz_target;

// `decode` must never panic on arbitrary bytes; every malformed input is
// supposed to surface as `None`, never as a bounds-check failure.
fuzz_target!(|data: &[u8]| {
    let _ = qoaf::decode(data);
});
