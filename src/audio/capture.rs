//! Microphone capture feeding the spectrum analyser.
//!
//! The input stream and (when recording) the WAV writer live on one capture
//! thread, which mixes the input down to mono into a shared buffer. The
//! frame loop drains that buffer and analyses it each time it samples the
//! spectrum, so smoothing advances once per rendered frame.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};
use std::fs::File;
use std::io::BufWriter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use super::analyser::SpectrumAnalyser;
use super::sampler::SpectrumSource;
use super::spectrum::SpectrumBins;
use crate::acquisition::Acquisition;
use crate::error::AudioError;
use crate::params::{AnalyserConfig, RecordingConfig};

type WavSink = Arc<Mutex<hound::WavWriter<BufWriter<File>>>>;
type SampleBuffer = Arc<Mutex<Vec<f32>>>;

/// Capture ticks between WAV header updates
const WAV_FLUSH_TICKS: u64 = 100;

/// Longest wait for the capture thread to finish when dropping a capture
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Oldest samples are dropped beyond this while nobody reads the buffer
const MAX_BUFFERED_SAMPLES: usize = 1 << 16;

/// Running microphone capture
///
/// Dropping it stops the capture thread and waits until the thread has
/// released the input stream and finished the WAV file.
pub struct AudioCapture {
    samples: SampleBuffer,
    analyser: SpectrumAnalyser,
    pending: Vec<f32>,
    stop: Arc<AtomicBool>,
    /// Disconnects once the capture thread is done
    finished: Receiver<()>,
    device_name: String,
}

/// Capture-thread side of an [`AudioCapture`]
struct CaptureHandle {
    stop: Arc<AtomicBool>,
    _finished: Sender<()>,
}

impl AudioCapture {
    /// Start the capture handshake on a background thread
    ///
    /// # Arguments
    /// * `device_query` - Case-insensitive substring of the input device name
    /// * `recording` - Also write the mono input to a WAV file
    pub fn start(
        device_query: Option<String>,
        recording: Option<RecordingConfig>,
    ) -> Acquisition<Box<dyn SpectrumSource>, AudioError> {
        let (tx, acquisition) = Acquisition::channel("audio capture");
        let spawned = thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || run_capture(device_query, recording, AnalyserConfig::default(), tx));

        match spawned {
            Ok(_) => acquisition,
            Err(e) => {
                log::warn!("Failed to spawn audio capture thread: {}", e);
                Acquisition::unavailable("audio capture")
            }
        }
    }

    fn new(
        samples: SampleBuffer,
        analyser: SpectrumAnalyser,
        device_name: String,
    ) -> (Self, CaptureHandle) {
        let stop = Arc::new(AtomicBool::new(false));
        let (finished_tx, finished) = mpsc::channel();
        let capture = Self {
            samples,
            analyser,
            pending: Vec::new(),
            stop: Arc::clone(&stop),
            finished,
            device_name,
        };
        let handle = CaptureHandle {
            stop,
            _finished: finished_tx,
        };
        (capture, handle)
    }
}

impl SpectrumSource for AudioCapture {
    fn read_bins(&mut self, out: &mut SpectrumBins) {
        if let Ok(mut buf) = self.samples.lock() {
            std::mem::swap(&mut *buf, &mut self.pending);
        }
        self.analyser.push_samples(&self.pending);
        self.pending.clear();
        self.analyser.analyse(out);
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // Disconnects once the capture thread drops its handle
        match self.finished.recv_timeout(STOP_TIMEOUT) {
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("Audio capture on {} did not stop in time", self.device_name)
            }
            _ => log::debug!("Audio capture on {} stopped", self.device_name),
        }
    }
}

/// Capture thread body: handshake, then keep the stream alive until stopped
fn run_capture(
    device_query: Option<String>,
    recording: Option<RecordingConfig>,
    config: AnalyserConfig,
    handshake: Sender<Result<Box<dyn SpectrumSource>, AudioError>>,
) {
    let analyser = match SpectrumAnalyser::new(config.clone()) {
        Ok(analyser) => analyser,
        Err(e) => {
            let _ = handshake.send(Err(AudioError::InvalidConfig(e)));
            return;
        }
    };

    let samples = SampleBuffer::default();
    let (stream, device_name, sample_rate_hz, wav) =
        match open_input(device_query.as_deref(), recording.as_ref(), &samples) {
            Ok(opened) => opened,
            Err(e) => {
                let _ = handshake.send(Err(e));
                return;
            }
        };

    log::info!("Audio: {} @ {}Hz", device_name, sample_rate_hz);

    let (capture, handle) = AudioCapture::new(samples, analyser, device_name);
    if let Err(unsent) = handshake.send(Ok(Box::new(capture))) {
        // Nobody is waiting for the spectrum any more
        drop(handle);
        drop(unsent);
        return;
    }

    let worker = CaptureWorker {
        wav,
        interval: Duration::from_millis(config.poll_interval_ms),
    };
    worker.run(handle, stream);
}

/// Keeps the input alive and the WAV header current until stopped
struct CaptureWorker {
    wav: Option<WavSink>,
    interval: Duration,
}

impl CaptureWorker {
    /// Loop until the capture is dropped, then release `stream` and finish the WAV
    fn run<S>(self, handle: CaptureHandle, stream: S) {
        let mut ticks: u64 = 0;
        while !handle.stop.load(Ordering::Relaxed) {
            thread::sleep(self.interval);

            // Keep the WAV header current in case the process is killed
            ticks += 1;
            if ticks % WAV_FLUSH_TICKS == 0 {
                flush_wav(self.wav.as_ref());
            }
        }

        drop(stream);
        finalize_wav(self.wav);
        log::debug!("Audio capture thread stopped");
        drop(handle);
    }
}

/// Open and start the input stream, accumulating mono samples into `sample_buffer`
fn open_input(
    device_query: Option<&str>,
    recording: Option<&RecordingConfig>,
    sample_buffer: &SampleBuffer,
) -> Result<(cpal::Stream, String, u32, Option<WavSink>), AudioError> {
    let host = cpal::default_host();
    let device = select_input_device(&host, device_query)?;
    let supported = device.default_input_config()?;
    let sample_rate_hz = supported.sample_rate().0;
    let channels = supported.channels() as usize;
    let config: cpal::StreamConfig = supported.clone().into();
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let wav = match recording {
        Some(rec) => {
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: sample_rate_hz,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            };
            let writer = hound::WavWriter::create(rec.audio_path(), spec)?;
            log::info!("Recording input audio to {}", rec.audio_path().display());
            Some(Arc::new(Mutex::new(writer)))
        }
        None => None,
    };

    let err_fn = |err: cpal::StreamError| log::error!("Audio stream error: {}", err);

    let stream = match supported.sample_format() {
        SampleFormat::F32 => {
            let (buf, wav) = (Arc::clone(sample_buffer), wav.clone());
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    push_interleaved(data, channels, &buf, wav.as_ref())
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::I16 => {
            let (buf, wav) = (Arc::clone(sample_buffer), wav.clone());
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    push_interleaved(data, channels, &buf, wav.as_ref())
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::U16 => {
            let (buf, wav) = (Arc::clone(sample_buffer), wav.clone());
            device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    push_interleaved(data, channels, &buf, wav.as_ref())
                },
                err_fn,
                None,
            )?
        }
        fmt => return Err(AudioError::UnsupportedFormat(format!("{:?}", fmt))),
    };

    stream.play()?;
    Ok((stream, device_name, sample_rate_hz, wav))
}

fn flush_wav(wav: Option<&WavSink>) {
    let Some(writer) = wav else {
        return;
    };
    if let Ok(mut writer) = writer.lock() {
        if let Err(e) = writer.flush() {
            log::warn!("Failed to flush WAV recording: {}", e);
        }
    }
}

/// Write the final WAV header
///
/// Falls back to a flush while a stream callback still holds the writer.
fn finalize_wav(wav: Option<WavSink>) {
    let Some(sink) = wav else {
        return;
    };
    match Arc::try_unwrap(sink) {
        Ok(writer) => {
            let writer = writer.into_inner().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = writer.finalize() {
                log::warn!("Failed to finalize WAV recording: {}", e);
            }
        }
        Err(shared) => flush_wav(Some(&shared)),
    }
}

fn select_input_device(
    host: &cpal::Host,
    device_query: Option<&str>,
) -> Result<cpal::Device, AudioError> {
    if let Some(query) = device_query {
        let want = query.to_lowercase();
        let found = host.input_devices()?.find(|d| {
            d.name()
                .map(|n| n.to_lowercase().contains(&want))
                .unwrap_or(false)
        });
        return found.ok_or_else(|| AudioError::DeviceNotFound(query.to_string()));
    }

    host.default_input_device()
        .ok_or(AudioError::NoDefaultDevice)
}

/// Names of the available input devices
pub fn list_input_devices() -> Result<Vec<String>, AudioError> {
    let host = cpal::default_host();
    Ok(host
        .input_devices()?
        .map(|d| d.name().unwrap_or_else(|_| "<unknown>".to_string()))
        .collect())
}

/// Mix interleaved frames down to mono and hand them to the analyser buffer
fn push_interleaved<T: Sample<Float = f32> + Copy>(
    data: &[T],
    channels: usize,
    sample_buffer: &Mutex<Vec<f32>>,
    wav: Option<&WavSink>,
) {
    let Ok(mut buf) = sample_buffer.lock() else {
        return;
    };
    let mut writer = wav.and_then(|w| w.lock().ok());

    for frame in data.chunks(channels.max(1)) {
        let mono = mix_to_mono(frame);
        buf.push(mono);
        if let Some(ref mut w) = writer {
            let _ = w.write_sample(mono);
        }
    }

    if buf.len() > MAX_BUFFERED_SAMPLES {
        let excess = buf.len() - MAX_BUFFERED_SAMPLES;
        buf.drain(..excess);
    }
}

fn mix_to_mono<T: Sample<Float = f32> + Copy>(frame: &[T]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f32 = frame.iter().map(|s| s.to_float_sample()).sum();
    sum / frame.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::BIN_COUNT;

    #[test]
    fn test_mix_to_mono_averages_channels() {
        assert_eq!(mix_to_mono(&[0.5f32, -0.5]), 0.0);
        assert_eq!(mix_to_mono(&[0.25f32, 0.75]), 0.5);
        assert_eq!(mix_to_mono::<f32>(&[]), 0.0);
    }

    #[test]
    fn test_push_interleaved_accumulates_frames() {
        let buffer = Mutex::new(Vec::new());
        push_interleaved(&[0.2f32, 0.4, 0.6, 0.8], 2, &buffer, None);
        let buf = buffer.lock().unwrap();
        assert_eq!(buf.len(), 2);
        assert!((buf[0] - 0.3).abs() < 1e-6);
        assert!((buf[1] - 0.7).abs() < 1e-6);
    }

    fn capture_over(samples: SampleBuffer) -> (AudioCapture, CaptureHandle) {
        let analyser = SpectrumAnalyser::new(AnalyserConfig::default()).unwrap();
        AudioCapture::new(samples, analyser, "test input".to_string())
    }

    #[test]
    fn test_buffer_keeps_only_recent_samples() {
        let buffer = Mutex::new(vec![0.0; MAX_BUFFERED_SAMPLES]);
        push_interleaved(&[1.0f32; 10], 1, &buffer, None);
        let buf = buffer.lock().unwrap();
        assert_eq!(buf.len(), MAX_BUFFERED_SAMPLES);
        assert_eq!(buf[MAX_BUFFERED_SAMPLES - 1], 1.0);
    }

    #[test]
    fn test_read_drains_buffer_into_spectrum() {
        let samples = SampleBuffer::default();
        push_interleaved(&[0.25f32; 2048], 1, &samples, None);

        let (mut capture, handle) = capture_over(Arc::clone(&samples));
        drop(handle);

        let mut bins = [0u8; BIN_COUNT];
        capture.read_bins(&mut bins);
        assert!(bins[0] > 0);
        assert!(samples.lock().unwrap().is_empty());

        // Smoothing advances on every read, even without new input
        let first = bins[0];
        capture.read_bins(&mut bins);
        assert!(bins[0] > first);
    }

    #[test]
    fn test_dropping_capture_finishes_recording() {
        let path =
            std::env::temp_dir().join(format!("vibescope-capture-{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let writer = hound::WavWriter::create(&path, spec).unwrap();
        let wav: WavSink = Arc::new(Mutex::new(writer));
        let samples = SampleBuffer::default();
        push_interleaved(&[0.25f32; 3000], 2, &samples, Some(&wav));

        let (capture, handle) = capture_over(samples);
        let worker = CaptureWorker {
            wav: Some(wav),
            interval: Duration::from_millis(1),
        };
        thread::spawn(move || worker.run(handle, ()));

        drop(capture);

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 1500);
        assert_eq!(reader.spec().sample_rate, 48_000);
        std::fs::remove_file(&path).unwrap();
    }
}
