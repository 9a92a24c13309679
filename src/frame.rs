// Quite OK Audio codec core
// Copyright (c) 2023 Dominic Szablewski
// SPDX-License-Identifier: MIT

//! Frame-level encode/decode: the 8-byte frame header, the per-channel LMS
//! state snapshot, and up to 256 slices per channel.
//!
//! This is the QOA analogue of claxon's `frame` module, but instead of a
//! bit-cursor over a `Read`, it works directly on byte slices since every
//! field here is either a whole 64-bit word or extracted from one with
//! plain shifts.

use crate::lms::Lms;
use crate::primitives::{clamp, div, read_u64, write_u64};
use crate::tables::{DEQUANT_TAB, QUANT_TAB};
use crate::Descriptor;

/// Samples encoded by a single slice.
pub const SLICE_LEN: usize = 20;

/// Maximum slices per channel in one frame.
pub const SLICES_PER_FRAME: usize = 256;

/// Maximum samples per channel in one frame (`SLICES_PER_FRAME * SLICE_LEN`).
pub const FRAME_LEN: usize = SLICES_PER_FRAME * SLICE_LEN;

const FRAME_HEADER_SIZE: usize = 8;
const LMS_STATE_SIZE: usize = 16;

/// Byte size of a frame carrying `slices` slices per channel, across
/// `channels` channels, including the frame header and LMS state.
pub fn frame_size(channels: usize, slices: usize) -> usize {
    FRAME_HEADER_SIZE + LMS_STATE_SIZE * channels + 8 * slices * channels
}

/// Encodes one frame of up to `FRAME_LEN` samples per channel.
///
/// `samples_in` holds exactly `frame_len * desc.channels` interleaved
/// samples. `desc.lms` is read as the state at the start of the frame and
/// left holding the state after the frame's last slice; the caller observes
/// it via `desc` afterwards. Returns the number of bytes written, which
/// equals `frame_size(channels, ceil(frame_len / SLICE_LEN))`.
pub fn encode_frame(samples_in: &[i16], desc: &mut Descriptor, frame_len: u32, bytes: &mut [u8]) -> usize {
    let channels = desc.channels as usize;
    let frame_len = frame_len as usize;
    let slices = (frame_len + SLICE_LEN - 1) / SLICE_LEN;
    let size = frame_size(channels, slices);

    let header = (desc.channels as u64) << 56
        | (desc.samplerate as u64) << 32
        | (frame_len as u64) << 16
        | (size as u64);
    write_u64(header, bytes, 0);

    let mut p = FRAME_HEADER_SIZE;
    for c in 0..channels {
        let (history, weights) = desc.lms[c].pack();
        write_u64(history, bytes, p);
        write_u64(weights, bytes, p + 8);
        p += LMS_STATE_SIZE;
    }

    let mut sample_index = 0;
    while sample_index < frame_len {
        let slice_len = SLICE_LEN.min(frame_len - sample_index);

        for c in 0..channels {
            let slice_start = sample_index * channels + c;

            let mut best_error = u64::MAX;
            let mut best_slice = 0u64;
            let mut best_lms = desc.lms[c];

            for scalefactor in 0..16usize {
                let mut lms = desc.lms[c];
                let mut slice = scalefactor as u64;
                let mut current_error = 0u64;

                for i in 0..slice_len {
                    let si = slice_start + i * channels;
                    let sample = samples_in[si] as i32;
                    let predicted = lms.predict();
                    let residual = sample - predicted;
                    let scaled = div(residual, scalefactor);
                    let clamped = clamp(scaled, -8, 8);
                    let quantized = QUANT_TAB[(clamped + 8) as usize];
                    let dequantized = DEQUANT_TAB[scalefactor][quantized as usize];
                    let reconstructed = clamp(predicted + dequantized, -32768, 32767);

                    let err = (sample - reconstructed) as i64;
                    current_error += (err * err) as u64;
                    if current_error > best_error {
                        break;
                    }

                    lms.update(reconstructed, dequantized);
                    slice = (slice << 3) | quantized as u64;
                }

                if current_error < best_error {
                    best_error = current_error;
                    best_slice = slice;
                    best_lms = lms;
                }
            }

            desc.lms[c] = best_lms;
            #[cfg(feature = "record-total-error")]
            {
                desc.error += best_error as f64;
            }

            // A short final slice leaves low-order residual positions
            // unset; shift them into place so the padding lands in the
            // least-significant bits, not interleaved with real residuals.
            best_slice <<= (SLICE_LEN - slice_len) * 3;
            write_u64(best_slice, bytes, p);
            p += 8;
        }

        sample_index += SLICE_LEN;
    }

    size
}

/// Decodes one frame, writing reconstructed samples into `samples_out`.
///
/// `desc.channels`/`desc.samplerate` must already be set (from
/// [`crate::decode_header`] or a prior frame) and are validated against the
/// frame header. Returns `(bytes_consumed, frame_len)`; both are `0` if the
/// frame is malformed in any way the error handling design describes, in
/// which case `samples_out` and `desc.lms` are left untouched.
pub fn decode_frame(bytes: &[u8], desc: &mut Descriptor, samples_out: &mut [i16]) -> (usize, u32) {
    let channels = desc.channels as usize;

    if bytes.len() < FRAME_HEADER_SIZE + LMS_STATE_SIZE * channels {
        return (0, 0);
    }

    let header = read_u64(bytes, 0);
    let frame_channels = ((header >> 56) & 0xff) as u8;
    let samplerate = ((header >> 32) & 0x00ff_ffff) as u32;
    let samples = ((header >> 16) & 0xffff) as u32;
    let frame_size_field = (header & 0xffff) as usize;

    let data_size = match frame_size_field.checked_sub(FRAME_HEADER_SIZE + LMS_STATE_SIZE * channels) {
        Some(d) => d,
        None => return (0, 0),
    };
    let num_slices = data_size / 8;
    let max_total_samples = num_slices * SLICE_LEN;

    if frame_channels != desc.channels
        || samplerate != desc.samplerate
        || frame_size_field > bytes.len()
        || samples as usize * channels > max_total_samples
    {
        return (0, 0);
    }

    let mut p = FRAME_HEADER_SIZE;
    for c in 0..channels {
        let history = read_u64(bytes, p);
        let weights = read_u64(bytes, p + 8);
        desc.lms[c] = Lms::unpack(history, weights);
        p += LMS_STATE_SIZE;
    }

    let mut sample_index = 0u32;
    while sample_index < samples {
        let end = (sample_index + SLICE_LEN as u32).min(samples);

        for c in 0..channels {
            let mut slice = read_u64(bytes, p);
            p += 8;

            let scalefactor = ((slice >> 60) & 0xf) as usize;

            let mut k = sample_index;
            while k < end {
                let predicted = desc.lms[c].predict();
                let quantized = ((slice >> 57) & 0x7) as usize;
                let dequantized = DEQUANT_TAB[scalefactor][quantized];
                let reconstructed = clamp(predicted + dequantized, -32768, 32767);

                samples_out[k as usize * channels + c] = reconstructed as i16;
                slice <<= 3;
                desc.lms[c].update(reconstructed, dequantized);

                k += 1;
            }
        }

        sample_index += SLICE_LEN as u32;
    }

    (p, samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(channels: u8, samplerate: u32, samples: u32) -> Descriptor {
        Descriptor::new(channels, samplerate, samples)
    }

    #[test]
    fn single_full_slice_frame_is_thirty_two_bytes() {
        let mut d = desc(1, 8000, 20);
        for c in 0..1usize {
            d.lms[c] = Lms::new_encoder();
        }
        let samples: Vec<i16> = (0..20).map(|i| (i * 37) as i16).collect();
        let mut bytes = vec![0u8; frame_size(1, 1)];
        let written = encode_frame(&samples, &mut d, 20, &mut bytes);
        // frame header (8) + lms state (16) + one slice (8), no file header.
        assert_eq!(written, 8 + 16 + 8);
        assert_eq!(written, bytes.len());
    }

    #[test]
    fn encode_then_decode_one_frame_roundtrips() {
        let mut enc_desc = desc(2, 44100, 50);
        for c in 0..2usize {
            enc_desc.lms[c] = Lms::new_encoder();
        }
        let samples: Vec<i16> = (0..100).map(|i| ((i * 123) % 2000 - 1000) as i16).collect();
        let slices = (50 + SLICE_LEN - 1) / SLICE_LEN;
        let mut bytes = vec![0u8; frame_size(2, slices)];
        let written = encode_frame(&samples, &mut enc_desc, 50, &mut bytes);
        assert_eq!(written, bytes.len());

        let mut dec_desc = desc(2, 44100, 50);
        let mut out = vec![0i16; 100];
        let (consumed, frame_len) = decode_frame(&bytes, &mut dec_desc, &mut out);
        assert_eq!(consumed, written);
        assert_eq!(frame_len, 50);

        for (a, b) in samples.iter().zip(out.iter()) {
            assert!((*a as i32 - *b as i32).abs() <= (1 << 14));
        }
    }

    #[test]
    fn decode_frame_rejects_too_few_bytes() {
        let mut d = desc(2, 44100, 50);
        let bytes = vec![0u8; 8]; // not enough for 2-channel LMS state
        let mut out = vec![0i16; 100];
        assert_eq!(decode_frame(&bytes, &mut d, &mut out), (0, 0));
    }

    #[test]
    fn decode_frame_rejects_channel_mismatch() {
        let mut enc_desc = desc(1, 44100, 20);
        enc_desc.lms[0] = Lms::new_encoder();
        let samples = vec![0i16; 20];
        let mut bytes = vec![0u8; frame_size(1, 1)];
        encode_frame(&samples, &mut enc_desc, 20, &mut bytes);

        let mut dec_desc = desc(2, 44100, 20); // wrong channel count
        let mut out = vec![0i16; 40];
        assert_eq!(decode_frame(&bytes, &mut dec_desc, &mut out), (0, 0));
    }
}
