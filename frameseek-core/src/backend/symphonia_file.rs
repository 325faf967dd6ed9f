//! Local audio files through symphonia (WAV, FLAC, MP3, Vorbis, AAC, ...).
//!
//! Only audio tracks are decodable; anything else is reported as
//! [`StreamParams::Other`]. Decoded buffers are always handed out as
//! interleaved `f32`.

use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecParameters, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::{Error as SymphoniaError, SeekErrorKind};
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;

use super::{
    AudioParams, BackendError, Container, MediaBackend, Packet, RawFrame, RawPayload, RawSamples,
    Rational, ReadStatus, ReceiveStatus, SeekTarget, StreamDecoder, StreamInfo, StreamParams,
};
use crate::convert::{SampleData, SampleFormat};

fn codec_name(params: &CodecParameters) -> String {
    symphonia::default::get_codecs()
        .get_codec(params.codec)
        .map(|c| c.short_name.to_string())
        .unwrap_or_else(|| format!("unknown({:?})", params.codec))
}

#[derive(Default)]
pub struct SymphoniaBackend;

impl SymphoniaBackend {
    pub fn new() -> Self {
        Self
    }
}

impl MediaBackend for SymphoniaBackend {
    fn name(&self) -> &str {
        "symphonia"
    }

    fn open(&self, locator: &str) -> Result<Box<dyn Container>, BackendError> {
        let path = Path::new(locator);
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BackendError::NotFound(locator.to_string()),
            _ => BackendError::Io(e),
        })?;

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        Ok(Box::new(SymphoniaContainer {
            pending: Some((file, hint)),
            format: None,
            tracks: Vec::new(),
            streams: Vec::new(),
            duration_us: None,
            at_end: false,
        }))
    }
}

struct SymphoniaContainer {
    /// File waiting to be probed
    pending: Option<(File, Hint)>,
    format: Option<Box<dyn FormatReader>>,
    /// (track id, codec parameters) in stream order
    tracks: Vec<(u32, CodecParameters)>,
    streams: Vec<StreamInfo>,
    duration_us: Option<i64>,
    /// Set when a seek lands past the last packet
    at_end: bool,
}

impl SymphoniaContainer {
    fn format(&mut self) -> Result<&mut Box<dyn FormatReader>, BackendError> {
        self.format
            .as_mut()
            .ok_or_else(|| BackendError::InvalidData("container not probed".into()))
    }
}

impl Container for SymphoniaContainer {
    fn probe(&mut self) -> Result<(), BackendError> {
        let (file, hint) = self
            .pending
            .take()
            .ok_or_else(|| BackendError::InvalidData("container already probed".into()))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| BackendError::InvalidData(format!("probe: {e}")))?;
        let format = probed.format;

        for track in format.tracks() {
            let params = &track.codec_params;
            let time_base = match (params.time_base, params.sample_rate) {
                (Some(tb), _) => Rational::new(tb.numer as i64, tb.denom as i64),
                (None, Some(rate)) => Rational::new(1, rate as i64),
                (None, None) => Rational::new(0, 0),
            };

            let stream_params = match (params.codec != CODEC_TYPE_NULL, params.sample_rate) {
                (true, Some(sample_rate)) => StreamParams::Audio(AudioParams {
                    sample_rate,
                    channels: params.channels.map(|c| c.count() as u32).unwrap_or(0),
                    sample_format: SampleFormat::F32,
                    frame_size: params
                        .max_frames_per_packet
                        .and_then(|n| u32::try_from(n).ok()),
                }),
                _ => StreamParams::Other,
            };

            if self.duration_us.is_none() {
                if let (Some(tb), Some(n_frames)) = (params.time_base, params.n_frames) {
                    let time = tb.calc_time(n_frames);
                    self.duration_us =
                        Some(time.seconds as i64 * 1_000_000 + (time.frac * 1_000_000.0) as i64);
                }
            }

            self.streams.push(StreamInfo {
                index: self.streams.len(),
                codec: codec_name(params),
                time_base,
                params: stream_params,
            });
            self.tracks.push((track.id, params.clone()));
        }

        tracing::debug!(tracks = self.tracks.len(), "symphonia probe complete");
        self.format = Some(format);
        Ok(())
    }

    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn duration_us(&self) -> Option<i64> {
        self.duration_us
    }

    fn read_packet(&mut self, packet: &mut Packet) -> Result<ReadStatus, BackendError> {
        packet.clear();
        if self.at_end {
            return Ok(ReadStatus::EndOfStream);
        }

        let next = match self.format()?.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.at_end = true;
                return Ok(ReadStatus::EndOfStream);
            }
            Err(e) => return Err(BackendError::InvalidData(format!("read: {e}"))),
        };

        let stream_index = self
            .tracks
            .iter()
            .position(|(id, _)| *id == next.track_id())
            .ok_or_else(|| BackendError::InvalidData(format!("unknown track {}", next.track_id())))?;

        packet.stream_index = stream_index;
        packet.pts = i64::try_from(next.ts()).ok();
        packet.duration = next.dur() as i64;
        packet.keyframe = true;
        packet.data.try_reserve(next.buf().len())?;
        packet.data.extend_from_slice(next.buf());
        Ok(ReadStatus::Packet)
    }

    fn seek(&mut self, target: SeekTarget) -> Result<(), BackendError> {
        let track_id = match target.stream_index {
            Some(index) => Some(
                self.tracks
                    .get(index)
                    .map(|(id, _)| *id)
                    .ok_or_else(|| BackendError::Seek(format!("no stream {index}")))?,
            ),
            None => None,
        };

        // Keeps symphonia's tick arithmetic from overflowing on absurd targets
        let seconds = (target.timestamp_ms.max(0) as f64 / 1000.0).min(u32::MAX as f64);
        let seek_to = SeekTo::Time {
            time: Time::from(seconds),
            track_id,
        };

        match self.format()?.seek(SeekMode::Accurate, seek_to) {
            Ok(_) => {
                self.at_end = false;
                Ok(())
            }
            Err(SymphoniaError::SeekError(SeekErrorKind::OutOfRange)) => {
                self.at_end = true;
                Ok(())
            }
            Err(e) => Err(BackendError::Seek(e.to_string())),
        }
    }

    fn open_decoder(&self, stream: &StreamInfo) -> Result<Box<dyn StreamDecoder>, BackendError> {
        let (track_id, params) = self
            .tracks
            .get(stream.index)
            .ok_or_else(|| BackendError::InvalidData(format!("no stream {}", stream.index)))?;

        if !matches!(stream.params, StreamParams::Audio(_)) {
            return Err(BackendError::UnsupportedCodec(stream.codec.clone()));
        }

        let decoder = symphonia::default::get_codecs()
            .make(params, &DecoderOptions::default())
            .map_err(|e| match e {
                SymphoniaError::Unsupported(what) => BackendError::UnsupportedCodec(what.to_string()),
                other => BackendError::Codec(other.to_string()),
            })?;

        Ok(Box::new(SymphoniaDecoder {
            name: stream.codec.clone(),
            track_id: *track_id,
            decoder,
            ready: VecDeque::new(),
            eof: false,
        }))
    }
}

struct SymphoniaDecoder {
    name: String,
    track_id: u32,
    decoder: Box<dyn symphonia::core::codecs::Decoder>,
    ready: VecDeque<(Option<i64>, RawSamples)>,
    eof: bool,
}

impl StreamDecoder for SymphoniaDecoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_packet(&mut self, packet: &Packet) -> Result<(), BackendError> {
        let ts = packet.pts.unwrap_or(0).max(0) as u64;
        let sym_packet = symphonia::core::formats::Packet::new_from_slice(
            self.track_id,
            ts,
            packet.duration.max(0) as u64,
            &packet.data,
        );

        let decoded = match self.decoder.decode(&sym_packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt packet, skip it
                tracing::warn!(ts, "audio decode error: {e}");
                return Ok(());
            }
            Err(e) => return Err(BackendError::Codec(e.to_string())),
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();
        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        let mut samples = Vec::new();
        samples.try_reserve_exact(buf.samples().len())?;
        samples.extend_from_slice(buf.samples());

        self.ready.push_back((
            packet.pts,
            RawSamples {
                sample_rate: spec.rate,
                channels: spec.channels.count() as u32,
                frames,
                data: SampleData::F32(samples),
            },
        ));
        Ok(())
    }

    fn send_eof(&mut self) -> Result<(), BackendError> {
        self.eof = true;
        Ok(())
    }

    fn receive_frame(&mut self, frame: &mut RawFrame) -> Result<ReceiveStatus, BackendError> {
        match self.ready.pop_front() {
            Some((pts, samples)) => {
                frame.pts = pts;
                frame.payload = RawPayload::Samples(samples);
                Ok(ReceiveStatus::Frame)
            }
            None if self.eof => Ok(ReceiveStatus::EndOfStream),
            None => Ok(ReceiveStatus::NeedMore),
        }
    }

    fn flush(&mut self) {
        self.decoder.reset();
        self.ready.clear();
        self.eof = false;
    }
}
