// Quite OK Audio codec core
// Copyright (c) 2023 Dominic Szablewski
// SPDX-License-Identifier: MIT

//! A decoder and encoder for the "Quite OK Audio" (QOA) format: a lossy
//! audio codec that compresses 16-bit PCM at a fixed 1:~5 ratio using a
//! per-channel adaptive linear predictor and 3-bit quantized residuals.
//!
//! This crate is the codec core only. It is a pure function on buffers: it
//! takes sample or byte slices and returns owned `Vec`s, and does not touch
//! the filesystem, spawn threads, or log anything. Reading/writing files,
//! marshalling samples into a host application's own types, and command-line
//! tools are all left to the caller, the same way claxon (a FLAC decoder
//! with a similar scope) leaves those concerns to its callers.
//!
//! # Layout
//!
//! - [`tables`] — the constant scalefactor/reciprocal/quantization tables.
//! - [`primitives`] — big-endian word access and fixed-point arithmetic.
//! - [`lms`] — the adaptive predictor.
//! - [`frame`] — frame-level encode/decode.
//!
//! The file-level operations ([`encode`], [`decode`], [`encode_header`],
//! [`decode_header`], [`max_frame_size`]) and the [`Descriptor`] type live
//! at the crate root, mirroring how claxon exposes `FlacStream` and
//! `StreamInfo` directly from `lib.rs` rather than burying them in a
//! submodule.

pub mod frame;
pub mod lms;
pub mod primitives;
pub mod tables;

use lms::Lms;
use primitives::read_u64;

/// Magic bytes `'qoaf'`, stored in the top 32 bits of the file header.
const MAGIC: u32 = 0x716f_6166;

/// Smallest buffer `decode_header` will accept.
const MIN_FILESIZE: usize = 16;

/// Largest channel count the wire format and [`Descriptor::lms`] support.
pub const MAX_CHANNELS: usize = 8;

/// Per-invocation state: channel count, samplerate, sample count, and the
/// current per-channel LMS predictor state.
///
/// A `Descriptor` is constructed fresh for each [`encode`]/[`decode`] call;
/// nothing persists across invocations. On encode, the caller fills in
/// `channels`/`samplerate`/`samples` and `encode` initializes `lms`. On
/// decode, `decode_header`/`decode_frame` populate all of it, and
/// `samples` is overwritten with the number of samples actually decoded,
/// which may be less than the file header promised if decoding stopped on
/// a malformed frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Descriptor {
    /// Number of interleaved channels, in `1..=8`.
    pub channels: u8,
    /// Samplerate in Hz, in `1..=0xff_ffff` (fits 24 bits).
    pub samplerate: u32,
    /// Samples per channel.
    pub samples: u32,
    /// Current predictor state, one entry per channel in `0..channels`.
    pub lms: [Lms; MAX_CHANNELS],
    /// Running sum of squared prediction errors, accumulated per encoded
    /// slice. Only present when the `record-total-error` feature is
    /// enabled, mirroring the reference `QOA_RECORD_TOTAL_ERROR` define.
    #[cfg(feature = "record-total-error")]
    pub error: f64,
}

impl Descriptor {
    /// Builds a descriptor ready to pass to [`encode`]; `lms` is left at
    /// its default (all zero) and is overwritten by `encode` itself.
    pub fn new(channels: u8, samplerate: u32, samples: u32) -> Descriptor {
        Descriptor {
            channels,
            samplerate,
            samples,
            ..Default::default()
        }
    }
}

/// Largest possible frame size (header + LMS state + a full 256 slices per
/// channel) for `desc.channels` channels.
pub fn max_frame_size(desc: &Descriptor) -> usize {
    frame::frame_size(desc.channels as usize, frame::SLICES_PER_FRAME)
}

/// Writes the 8-byte file header: magic in the top 32 bits, `desc.samples`
/// in the low 32 bits. Always returns `8`.
pub fn encode_header(desc: &Descriptor, bytes: &mut [u8]) -> usize {
    let header = (MAGIC as u64) << 32 | desc.samples as u64;
    primitives::write_u64(header, bytes, 0);
    8
}

/// Parses the 8-byte file header and peeks into the first frame header to
/// recover `channels`/`samplerate` (the file header alone does not carry
/// them). Populates `desc` and returns `8` on success; returns `0` without
/// touching `desc` if `bytes` is too short, the magic does not match, if
/// samples/channels/samplerate is zero, or if channels exceeds
/// [`MAX_CHANNELS`]. The parse cursor is not
/// advanced past the file header: [`frame::decode_frame`] re-reads the same
/// frame header bytes this function peeked at.
pub fn decode_header(bytes: &[u8], desc: &mut Descriptor) -> usize {
    if bytes.len() < MIN_FILESIZE {
        return 0;
    }

    let file_header = read_u64(bytes, 0);
    if (file_header >> 32) as u32 != MAGIC {
        return 0;
    }
    let samples = (file_header & 0xffff_ffff) as u32;
    if samples == 0 {
        return 0;
    }

    let frame_header = read_u64(bytes, 8);
    let channels = ((frame_header >> 56) & 0xff) as u8;
    let samplerate = ((frame_header >> 32) & 0x00ff_ffff) as u32;
    if channels == 0 || channels as usize > MAX_CHANNELS || samplerate == 0 {
        return 0;
    }

    desc.channels = channels;
    desc.samplerate = samplerate;
    desc.samples = samples;
    8
}

/// Encodes `samples_in` (`desc.samples * desc.channels` interleaved 16-bit
/// samples) into a freshly allocated QOA byte buffer.
///
/// Returns `None` if `desc.channels` is out of `1..=8`, `desc.samplerate`
/// is out of `1..=0xff_ffff`, or `desc.samples == 0`. On success, `desc.lms`
/// is left holding the state after the last frame.
pub fn encode(samples_in: &[i16], desc: &mut Descriptor) -> Option<Vec<u8>> {
    if desc.samples == 0
        || desc.samplerate == 0
        || desc.samplerate > 0x00ff_ffff
        || desc.channels == 0
        || desc.channels as usize > MAX_CHANNELS
    {
        return None;
    }

    let channels = desc.channels as usize;
    let samples = desc.samples as usize;
    debug_assert_eq!(samples_in.len(), samples * channels);

    let num_frames = (samples + frame::FRAME_LEN - 1) / frame::FRAME_LEN;
    let num_slices = (samples + frame::SLICE_LEN - 1) / frame::SLICE_LEN;
    let encoded_size =
        8 + num_frames * 8 + num_frames * 16 * channels + num_slices * 8 * channels;

    let mut bytes = vec![0u8; encoded_size];

    for c in 0..channels {
        desc.lms[c] = Lms::new_encoder();
    }
    #[cfg(feature = "record-total-error")]
    {
        desc.error = 0.0;
    }

    let mut p = encode_header(desc, &mut bytes);

    let mut sample_index = 0usize;
    while sample_index < samples {
        let frame_len = frame::FRAME_LEN.min(samples - sample_index);
        let start = sample_index * channels;
        let end = (sample_index + frame_len) * channels;
        let written = frame::encode_frame(
            &samples_in[start..end],
            desc,
            frame_len as u32,
            &mut bytes[p..],
        );
        p += written;
        sample_index += frame_len;
    }

    Some(bytes)
}

/// Decodes a full QOA byte buffer into a descriptor and a sample buffer.
///
/// Returns `None` if the file header is malformed. If a
/// later frame is malformed, decoding stops there rather than failing
/// outright: the returned descriptor's `samples` reflects the number of
/// samples actually decoded, and the sample buffer is sized to what the
/// header promised but only filled up to that point (the remainder is the
/// default, zeroed, sample).
pub fn decode(bytes: &[u8]) -> Option<(Descriptor, Vec<i16>)> {
    let mut desc = Descriptor::default();
    let mut p = decode_header(bytes, &mut desc);
    if p == 0 {
        return None;
    }

    let channels = desc.channels as usize;
    let total_samples = desc.samples as usize;
    let mut samples_out = vec![0i16; total_samples * channels];

    let mut sample_index = 0usize;
    while sample_index < total_samples {
        let (consumed, frame_len) =
            frame::decode_frame(&bytes[p..], &mut desc, &mut samples_out[sample_index * channels..]);
        if consumed == 0 {
            break;
        }
        p += consumed;
        sample_index += frame_len as usize;
    }

    desc.samples = sample_index as u32;
    Some((desc, samples_out))
}
