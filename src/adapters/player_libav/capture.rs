//! Recorder sink fed from the player's live packet stream
//!
//! Played packets are decoded and re-encoded into codecs the target container
//! accepts (VP9/VP8/AV1 with Opus/Vorbis for WebM). Frames presented before
//! the capture origin are dropped, so replaying a keyframe's worth of packets
//! only primes the decoders. The muxed bytes are delivered as ordered chunks
//! once recording stops.

use ffmpeg_next::format::{sample, Pixel, Sample};
use ffmpeg_next::software::{resampling, scaling};
use ffmpeg_next::{
    codec, decoder, encoder, format, frame, media, ChannelLayout, Dictionary, Packet, Rational,
};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::domain::errors::CaptureFailure;
use crate::domain::model::OutputFormat;
use crate::ports::{RecorderEvent, RecorderEvents};

const VIDEO_TIME_BASE: Rational = Rational(1, 1000);
const VIDEO_BIT_RATE: usize = 2_500_000;
const AUDIO_RATE: i32 = 48_000;
const AUDIO_BIT_RATE: usize = 128_000;
const AUDIO_LAYOUT: ChannelLayout = ChannelLayout::STEREO;
const AUDIO_CHANNELS: usize = 2;
const DEFAULT_AUDIO_FRAME: usize = 1024;

/// What a recorder asks the player for when it starts
#[derive(Debug)]
pub(crate) struct CaptureRequest {
    pub format: OutputFormat,
    pub chunk_size: usize,
    pub events: RecorderEvents,
}

/// Video encoders by preference for each container
fn video_encoders(format: OutputFormat) -> &'static [&'static str] {
    match format {
        OutputFormat::Webm => &["libvpx-vp9", "libvpx", "libaom-av1", "libsvtav1"],
        OutputFormat::Mkv => &["libvpx-vp9", "libvpx", "libx264", "mpeg4"],
    }
}

/// Audio encoders by preference, with the sample layout each one takes
fn audio_encoders(format: OutputFormat) -> &'static [(&'static str, Sample)] {
    const OPUS: (&str, Sample) = ("libopus", Sample::F32(sample::Type::Packed));
    const VORBIS: (&str, Sample) = ("libvorbis", Sample::F32(sample::Type::Planar));
    const AAC: (&str, Sample) = ("aac", Sample::F32(sample::Type::Planar));
    match format {
        OutputFormat::Webm => &[OPUS, VORBIS],
        OutputFormat::Mkv => &[OPUS, VORBIS, AAC],
    }
}

pub(crate) struct CaptureSink {
    output: format::context::Output,
    file: NamedTempFile,
    format: OutputFormat,
    video: VideoLane,
    audio: Option<AudioLane>,
    out_time_bases: Vec<Rational>,
    origin: f64,
    chunk_size: usize,
    events: RecorderEvents,
    packets: usize,
}

impl CaptureSink {
    /// Set up decoders for the best video and audio stream of `input` and
    /// encoders for `request.format`. Output timestamps count from `origin`.
    pub(crate) fn open(
        input: &format::context::Input,
        origin: f64,
        request: CaptureRequest,
    ) -> Result<Self, CaptureFailure> {
        let format = request.format;
        let file = tempfile::Builder::new()
            .prefix("vidtrim-")
            .suffix(&format!(".{}", format.extension()))
            .tempfile()
            .map_err(|e| CaptureFailure::encoding(format!("cannot create capture file: {}", e)))?;

        let mut output = format::output_as(&file.path(), format.muxer_name()).map_err(|e| {
            CaptureFailure::not_supported(format!("{} muxer unavailable: {}", format.mime_type(), e))
        })?;

        let video_stream = input
            .streams()
            .best(media::Type::Video)
            .ok_or_else(|| CaptureFailure::not_supported("source has no video track"))?;
        let video = VideoLane::open(&video_stream, format, &mut output)?;

        let audio = match input.streams().best(media::Type::Audio) {
            Some(stream) => match AudioLane::open(&stream, format, &mut output) {
                Ok(lane) => Some(lane),
                Err(failure) => {
                    warn!(error = %failure, "recording without audio");
                    None
                }
            },
            None => None,
        };

        output.write_header().map_err(|e| {
            CaptureFailure::not_supported(format!(
                "{} cannot hold the encoded streams: {}",
                format.mime_type(),
                e
            ))
        })?;

        let out_time_bases = output.streams().map(|stream| stream.time_base()).collect();
        debug!(
            format = %format,
            origin,
            audio = audio.is_some(),
            path = %file.path().display(),
            "capture opened"
        );

        Ok(Self {
            output,
            file,
            format,
            video,
            audio,
            out_time_bases,
            origin,
            chunk_size: request.chunk_size.max(1),
            events: request.events,
            packets: 0,
        })
    }

    /// Feed one played packet through its decoder and encoder
    pub(crate) fn write(&mut self, packet: &Packet) -> Result<(), CaptureFailure> {
        let index = packet.stream();
        if index == self.video.in_index {
            let to = self.out_time_bases[self.video.out_index];
            self.packets += self.video.push(Some(packet), self.origin, &mut self.output, to)?;
        } else if let Some(audio) = self.audio.as_mut().filter(|lane| lane.in_index == index) {
            let to = self.out_time_bases[audio.out_index];
            self.packets += audio.push(Some(packet), self.origin, &mut self.output, to)?;
        }
        Ok(())
    }

    /// Close the container and deliver its bytes, then `Stopped`
    pub(crate) fn finish(mut self) {
        match self.finalize() {
            Ok(bytes) => {
                debug!(
                    packets = self.packets,
                    bytes = bytes.len(),
                    format = %self.format,
                    "capture finished"
                );
                emit_chunks(&bytes, self.chunk_size, &self.events);
            }
            Err(failure) => self.fail(failure),
        }
    }

    /// Abandon the recording and report why
    pub(crate) fn fail(self, failure: CaptureFailure) {
        warn!(error = %failure, "capture aborted");
        let _ = self.events.send(RecorderEvent::Error(failure));
    }

    fn finalize(&mut self) -> Result<Vec<u8>, CaptureFailure> {
        let to = self.out_time_bases[self.video.out_index];
        self.packets += self.video.push(None, self.origin, &mut self.output, to)?;
        if let Some(audio) = self.audio.as_mut() {
            let to = self.out_time_bases[audio.out_index];
            self.packets += audio.push(None, self.origin, &mut self.output, to)?;
        }

        self.output
            .write_trailer()
            .map_err(|e| CaptureFailure::encoding(format!("failed to finalize container: {}", e)))?;
        std::fs::read(self.file.path())
            .map_err(|e| CaptureFailure::encoding(format!("failed to read capture file: {}", e)))
    }
}

/// Deliver `bytes` as ordered `DataAvailable` chunks of at most `chunk_size`,
/// then `Stopped`
pub(crate) fn emit_chunks(bytes: &[u8], chunk_size: usize, events: &RecorderEvents) {
    for chunk in bytes.chunks(chunk_size.max(1)) {
        let _ = events.send(RecorderEvent::DataAvailable(chunk.to_vec()));
    }
    let _ = events.send(RecorderEvent::Stopped);
}

/// Move every packet the encoder has ready into the output stream `index`
pub(crate) fn drain_packets(
    encoder: &mut encoder::Encoder,
    index: usize,
    from: Rational,
    to: Rational,
    output: &mut format::context::Output,
) -> Result<usize, CaptureFailure> {
    let mut packet = Packet::empty();
    let mut written = 0;
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(index);
        packet.rescale_ts(from, to);
        packet.set_position(-1);
        packet
            .write_interleaved(output)
            .map_err(|e| CaptureFailure::encoding(format!("failed to write packet: {}", e)))?;
        written += 1;
    }
    Ok(written)
}

fn encoding_error(what: &str) -> impl FnOnce(ffmpeg_next::Error) -> CaptureFailure + '_ {
    move |e| CaptureFailure::encoding(format!("{}: {}", what, e))
}

struct VideoLane {
    in_index: usize,
    in_time_base: Rational,
    decoder: decoder::Video,
    encoder: encoder::video::Encoder,
    width: u32,
    height: u32,
    scaler: Option<(scaling::Context, Pixel, u32, u32)>,
    out_index: usize,
    last_pts: Option<i64>,
}

impl VideoLane {
    fn open(
        stream: &format::stream::Stream,
        format: OutputFormat,
        output: &mut format::context::Output,
    ) -> Result<Self, CaptureFailure> {
        let decoder = codec::Context::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|e| CaptureFailure::not_supported(format!("cannot decode video: {}", e)))?;
        let (width, height) = (decoder.width(), decoder.height());
        if width == 0 || height == 0 {
            return Err(CaptureFailure::not_supported("video track has no frame size"));
        }

        let codec = video_encoders(format)
            .iter()
            .find_map(|name| encoder::find_by_name(name))
            .ok_or_else(|| {
                CaptureFailure::not_supported(format!(
                    "no video encoder for {} is available",
                    format.mime_type()
                ))
            })?;

        let frame_rate = [stream.avg_frame_rate(), stream.rate()]
            .into_iter()
            .find(|rate| rate.numerator() > 0 && rate.denominator() > 0)
            .unwrap_or(Rational(30, 1));

        let mut config = codec::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(encoding_error("cannot configure video encoder"))?;
        config.set_width(width);
        config.set_height(height);
        config.set_format(Pixel::YUV420P);
        config.set_time_base(VIDEO_TIME_BASE);
        config.set_frame_rate(Some(frame_rate));
        config.set_bit_rate(VIDEO_BIT_RATE);
        config.set_flags(codec::Flags::GLOBAL_HEADER);

        // libvpx and libaom read these; other encoders leave them unused.
        let mut options = Dictionary::new();
        options.set("deadline", "realtime");
        options.set("cpu-used", "8");
        let encoder = config.open_with(options).map_err(|e| {
            CaptureFailure::not_supported(format!("cannot open {} encoder: {}", codec.name(), e))
        })?;

        let mut out_stream = output
            .add_stream(codec)
            .map_err(encoding_error("failed to add video stream"))?;
        out_stream.set_parameters(&encoder);
        debug!(codec = codec.name(), ?frame_rate, width, height, "video encoder opened");

        Ok(Self {
            in_index: stream.index(),
            in_time_base: stream.time_base(),
            decoder,
            encoder,
            width,
            height,
            scaler: None,
            out_index: out_stream.index(),
            last_pts: None,
        })
    }

    /// Decode `packet` (or flush on `None`) and encode whatever it yields
    fn push(
        &mut self,
        packet: Option<&Packet>,
        origin: f64,
        output: &mut format::context::Output,
        out_time_base: Rational,
    ) -> Result<usize, CaptureFailure> {
        let sent = match packet {
            Some(packet) => self.decoder.send_packet(packet),
            None => self.decoder.send_eof(),
        };
        if let Err(e) = sent {
            debug!(error = %e, "video packet not decodable");
        }

        let mut written = 0;
        let mut decoded = frame::Video::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            if self.encode(&decoded, origin)? {
                written += self.drain(output, out_time_base)?;
            }
        }

        if packet.is_none() {
            self.encoder
                .send_eof()
                .map_err(encoding_error("failed to flush video encoder"))?;
            written += self.drain(output, out_time_base)?;
        }
        Ok(written)
    }

    fn drain(
        &mut self,
        output: &mut format::context::Output,
        out_time_base: Rational,
    ) -> Result<usize, CaptureFailure> {
        drain_packets(&mut self.encoder, self.out_index, VIDEO_TIME_BASE, out_time_base, output)
    }

    /// Send one decoded frame to the encoder; false if it precedes the origin
    fn encode(&mut self, decoded: &frame::Video, origin: f64) -> Result<bool, CaptureFailure> {
        let Some(timestamp) = decoded.timestamp() else {
            return Ok(false);
        };
        let seconds = timestamp as f64 * f64::from(self.in_time_base) - origin;
        if seconds < 0.0 {
            return Ok(false);
        }

        let mut pts = (seconds * f64::from(VIDEO_TIME_BASE.invert())).round() as i64;
        if let Some(last) = self.last_pts {
            pts = pts.max(last + 1);
        }
        self.last_pts = Some(pts);

        // Rebuilt whenever the decoder changes frame format or size mid-stream.
        let source = (decoded.format(), decoded.width(), decoded.height());
        let scaler = match self.scaler.take() {
            Some((context, format, width, height)) if (format, width, height) == source => context,
            _ => scaling::Context::get(
                source.0,
                source.1,
                source.2,
                Pixel::YUV420P,
                self.width,
                self.height,
                scaling::Flags::BILINEAR,
            )
            .map_err(encoding_error("cannot create frame scaler"))?,
        };
        let (format, width, height) = source;
        let scaler = &mut self.scaler.insert((scaler, format, width, height)).0;

        let mut scaled = frame::Video::empty();
        scaler
            .run(decoded, &mut scaled)
            .map_err(encoding_error("failed to scale frame"))?;
        scaled.set_pts(Some(pts));
        self.encoder
            .send_frame(&scaled)
            .map_err(encoding_error("failed to encode video frame"))?;
        Ok(true)
    }
}

struct AudioLane {
    in_index: usize,
    in_time_base: Rational,
    decoder: decoder::Audio,
    encoder: encoder::audio::Encoder,
    resampler: resampling::Context,
    format: Sample,
    frame_size: usize,
    /// Resampled bytes not yet handed to the encoder, one buffer per plane
    pending: Vec<Vec<u8>>,
    out_index: usize,
    next_pts: Option<i64>,
}

impl AudioLane {
    fn open(
        stream: &format::stream::Stream,
        format: OutputFormat,
        output: &mut format::context::Output,
    ) -> Result<Self, CaptureFailure> {
        let decoder = codec::Context::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().audio())
            .map_err(|e| CaptureFailure::not_supported(format!("cannot decode audio: {}", e)))?;

        let (codec, sample_format) = audio_encoders(format)
            .iter()
            .find_map(|(name, sample_format)| {
                encoder::find_by_name(name).map(|codec| (codec, *sample_format))
            })
            .ok_or_else(|| {
                CaptureFailure::not_supported(format!(
                    "no audio encoder for {} is available",
                    format.mime_type()
                ))
            })?;

        let mut config = codec::Context::new_with_codec(codec)
            .encoder()
            .audio()
            .map_err(encoding_error("cannot configure audio encoder"))?;
        config.set_format(sample_format);
        config.set_rate(AUDIO_RATE);
        config.set_channel_layout(AUDIO_LAYOUT);
        config.set_bit_rate(AUDIO_BIT_RATE);
        config.set_time_base(Rational(1, AUDIO_RATE));
        config.set_flags(codec::Flags::GLOBAL_HEADER);

        let encoder = config.open_with(Dictionary::new()).map_err(|e| {
            CaptureFailure::not_supported(format!("cannot open {} encoder: {}", codec.name(), e))
        })?;
        let frame_size = match encoder.frame_size() {
            0 => DEFAULT_AUDIO_FRAME,
            size => size as usize,
        };

        let resampler = resampling::Context::get(
            decoder.format(),
            decoder.channel_layout(),
            decoder.rate(),
            sample_format,
            AUDIO_LAYOUT,
            AUDIO_RATE as u32,
        )
        .map_err(encoding_error("cannot create audio resampler"))?;

        let mut out_stream = output
            .add_stream(codec)
            .map_err(encoding_error("failed to add audio stream"))?;
        out_stream.set_parameters(&encoder);
        debug!(codec = codec.name(), frame_size, "audio encoder opened");

        let planes = if sample_format.is_planar() { AUDIO_CHANNELS } else { 1 };
        Ok(Self {
            in_index: stream.index(),
            in_time_base: stream.time_base(),
            decoder,
            encoder,
            resampler,
            format: sample_format,
            frame_size,
            pending: vec![Vec::new(); planes],
            out_index: out_stream.index(),
            next_pts: None,
        })
    }

    /// Bytes one sample occupies in each plane
    fn sample_bytes(&self) -> usize {
        if self.format.is_planar() {
            self.format.bytes()
        } else {
            self.format.bytes() * AUDIO_CHANNELS
        }
    }

    fn push(
        &mut self,
        packet: Option<&Packet>,
        origin: f64,
        output: &mut format::context::Output,
        out_time_base: Rational,
    ) -> Result<usize, CaptureFailure> {
        let sent = match packet {
            Some(packet) => self.decoder.send_packet(packet),
            None => self.decoder.send_eof(),
        };
        if let Err(e) = sent {
            debug!(error = %e, "audio packet not decodable");
        }

        let mut decoded = frame::Audio::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            self.resample(&decoded, origin)?;
        }

        let flushing = packet.is_none();
        if flushing && self.next_pts.is_some() {
            let mut tail = frame::Audio::new(self.format, self.frame_size * 4, AUDIO_LAYOUT);
            if self.resampler.flush(&mut tail).is_ok() {
                self.buffer(&tail);
            }
        }

        let mut written = self.encode_pending(flushing, output, out_time_base)?;
        if flushing {
            self.encoder
                .send_eof()
                .map_err(encoding_error("failed to flush audio encoder"))?;
            written += self.drain(output, out_time_base)?;
        }
        Ok(written)
    }

    fn drain(
        &mut self,
        output: &mut format::context::Output,
        out_time_base: Rational,
    ) -> Result<usize, CaptureFailure> {
        drain_packets(
            &mut self.encoder,
            self.out_index,
            Rational(1, AUDIO_RATE),
            out_time_base,
            output,
        )
    }

    /// Convert a decoded frame to the encoder's layout and queue its samples
    fn resample(&mut self, decoded: &frame::Audio, origin: f64) -> Result<(), CaptureFailure> {
        let in_rate = decoded.rate().max(1);
        let start = decoded
            .timestamp()
            .map(|ts| ts as f64 * f64::from(self.in_time_base) - origin);
        if let Some(start) = start {
            if start + decoded.samples() as f64 / f64::from(in_rate) <= 0.0 {
                return Ok(());
            }
        }
        if self.next_pts.is_none() {
            let offset = start.unwrap_or(0.0).max(0.0);
            self.next_pts = Some((offset * f64::from(AUDIO_RATE)).round() as i64);
        }

        let capacity = decoded.samples() * AUDIO_RATE as usize / in_rate as usize + 256;
        let mut resampled = frame::Audio::new(self.format, capacity, AUDIO_LAYOUT);
        self.resampler
            .run(decoded, &mut resampled)
            .map_err(encoding_error("failed to resample audio"))?;
        self.buffer(&resampled);
        Ok(())
    }

    fn buffer(&mut self, resampled: &frame::Audio) {
        let length = resampled.samples() * self.sample_bytes();
        for (plane, pending) in self.pending.iter_mut().enumerate() {
            pending.extend_from_slice(&resampled.data(plane)[..length]);
        }
    }

    /// Encode every full frame queued; with `pad`, the remainder too,
    /// padded with silence
    fn encode_pending(
        &mut self,
        pad: bool,
        output: &mut format::context::Output,
        out_time_base: Rational,
    ) -> Result<usize, CaptureFailure> {
        let frame_bytes = self.frame_size * self.sample_bytes();
        let mut written = 0;
        loop {
            let available = self.pending[0].len();
            if available == 0 || (available < frame_bytes && !pad) {
                return Ok(written);
            }

            let take = available.min(frame_bytes);
            let mut frame = frame::Audio::new(self.format, self.frame_size, AUDIO_LAYOUT);
            for (plane, pending) in self.pending.iter_mut().enumerate() {
                let data = frame.data_mut(plane);
                data[..take].copy_from_slice(&pending[..take]);
                data[take..frame_bytes].fill(0);
                pending.drain(..take);
            }

            let pts = self.next_pts.unwrap_or(0);
            frame.set_rate(AUDIO_RATE as u32);
            frame.set_pts(Some(pts));
            self.next_pts = Some(pts + self.frame_size as i64);
            self.encoder
                .send_frame(&frame)
                .map_err(encoding_error("failed to encode audio frame"))?;
            written += self.drain(output, out_time_base)?;
        }
    }
}
