//! CommandRecorder tests
//!
//! All scenarios run against scripted frame sources and a scripted VAD,
//! so the silence/hangover/abort arithmetic is exact: frames are 512
//! samples = 32ms, silence timeout 2s, hangover 0.8s, abort 3s.

mod common;

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use common::{frame_script, FakeVad, FRAME};
use vigil_app::recorder::{CommandRecorder, RecorderConfig, StopReason};
use vigil_audio::source::ScriptedSource;

fn recorder() -> CommandRecorder {
    CommandRecorder::new(RecorderConfig {
        max_duration: Duration::from_secs(15),
        silence_timeout: Duration::from_secs(2),
        speech_threshold: 0.5,
    })
}

// 0.8s hangover at 32ms frames: silence frames strictly inside the window
const HANGOVER_FRAMES: usize = 24;

// ─── Termination ────────────────────────────────────────────────────

#[test]
fn silence_after_speech_terminates_and_excludes_tail() {
    // ~1s of speech, then silence past the timeout. The
    // result is start..end-of-hangover, nothing beyond it.
    let base = Instant::now();
    let mut source = ScriptedSource::new(frame_script(base, &[(31, 1), (100, 2)]));
    let mut vad = FakeVad::from_segments(&[(31, 0.9)], 0.0);

    let recording = recorder().record(&mut source, &mut vad);

    assert_eq!(recording.stop, StopReason::Silence);
    assert_eq!(recording.samples.len(), (31 + HANGOVER_FRAMES) * FRAME);

    // Speech frames first, then exactly the hangover tail of silence
    assert!(recording.samples[..31 * FRAME].iter().all(|&s| s == 1));
    assert!(recording.samples[31 * FRAME..].iter().all(|&s| s == 2));
}

#[test]
fn no_speech_aborts_with_empty_buffer() {
    let base = Instant::now();
    let mut source = ScriptedSource::new(frame_script(base, &[(120, 3)]));
    let mut vad = FakeVad::new(Vec::new(), 0.0);

    let recording = recorder().record(&mut source, &mut vad);

    assert_eq!(recording.stop, StopReason::NoSpeech);
    assert!(recording.is_empty(), "nothing spoken, nothing returned");
}

#[test]
fn no_speech_abort_discards_backlog_too() {
    let base = Instant::now();
    let mut source =
        ScriptedSource::new(frame_script(base, &[(120, 3)])).with_backlog(vec![7i16; 700]);
    let mut vad = FakeVad::new(Vec::new(), 0.0);

    let recording = recorder().record(&mut source, &mut vad);
    assert_eq!(recording.stop, StopReason::NoSpeech);
    assert!(recording.is_empty());
}

#[test]
fn hard_cap_always_wins_over_endless_speech() {
    let base = Instant::now();
    // 600 frames (~19s) of continuous speech
    let mut source = ScriptedSource::new(frame_script(base, &[(600, 1)]));
    let mut vad = FakeVad::new(Vec::new(), 0.9);

    let recording = recorder().record(&mut source, &mut vad);

    assert_eq!(recording.stop, StopReason::MaxDuration);
    // Frames strictly before the 15s mark: 32ms * 469 > 15s >= 32ms * 468
    assert_eq!(recording.samples.len(), 469 * FRAME);
    assert!(source.remaining() > 0, "cap fired before the script ran out");
}

#[test]
fn source_ending_terminates_recording() {
    let base = Instant::now();
    let mut source = ScriptedSource::new(frame_script(base, &[(10, 1)]));
    let mut vad = FakeVad::new(Vec::new(), 0.9);

    let recording = recorder().record(&mut source, &mut vad);
    assert_eq!(recording.stop, StopReason::SourceEnded);
    assert_eq!(recording.samples.len(), 10 * FRAME);
}

// ─── Pre-roll and hangover ──────────────────────────────────────────

#[test]
fn preroll_ring_recovers_utterance_start() {
    let base = Instant::now();
    // 3 quiet frames, then speech: the quiet frames flush ahead of the
    // first speech frame instead of being lost.
    let mut source = ScriptedSource::new(frame_script(base, &[(3, 9), (10, 1), (80, 2)]));
    let mut vad = FakeVad::from_segments(&[(3, 0.0), (10, 0.9)], 0.0);

    let recording = recorder().record(&mut source, &mut vad);

    assert_eq!(recording.stop, StopReason::Silence);
    assert_eq!(
        recording.samples.len(),
        (3 + 10 + HANGOVER_FRAMES) * FRAME
    );
    assert!(recording.samples[..3 * FRAME].iter().all(|&s| s == 9));
    assert!(recording.samples[3 * FRAME..13 * FRAME].iter().all(|&s| s == 1));
}

#[test]
fn pause_longer_than_hangover_is_recovered_when_speech_resumes() {
    let base = Instant::now();
    // speech, a ~1s pause (beyond hangover, below silence timeout),
    // speech again, then final silence
    let mut source =
        ScriptedSource::new(frame_script(base, &[(5, 1), (30, 2), (5, 3), (70, 4)]));
    let mut vad = FakeVad::from_segments(&[(5, 0.9), (30, 0.0), (5, 0.9)], 0.0);

    let recording = recorder().record(&mut source, &mut vad);

    assert_eq!(recording.stop, StopReason::Silence);
    // Every pause frame survives: 24 inside the hangover window plus 6
    // flushed from the ring when speech resumed.
    assert_eq!(
        recording.samples.len(),
        (5 + 30 + 5 + HANGOVER_FRAMES) * FRAME
    );

    // Chronological order preserved across the flush
    assert!(recording.samples[..5 * FRAME].iter().all(|&s| s == 1));
    assert!(recording.samples[5 * FRAME..35 * FRAME].iter().all(|&s| s == 2));
    assert!(recording.samples[35 * FRAME..40 * FRAME].iter().all(|&s| s == 3));
    assert!(recording.samples[40 * FRAME..].iter().all(|&s| s == 4));
}

// ─── Backlog ────────────────────────────────────────────────────────

#[test]
fn device_backlog_is_prepended_to_the_recording() {
    let base = Instant::now();
    let mut source = ScriptedSource::new(frame_script(base, &[(10, 1), (80, 2)]))
        .with_backlog(vec![7i16; 700]);
    let mut vad = FakeVad::from_segments(&[(10, 0.9)], 0.0);

    let recording = recorder().record(&mut source, &mut vad);

    assert_eq!(recording.stop, StopReason::Silence);
    assert_eq!(
        recording.samples.len(),
        700 + (10 + HANGOVER_FRAMES) * FRAME
    );
    assert!(recording.samples[..700].iter().all(|&s| s == 7));
    assert!(recording.samples[700..700 + 10 * FRAME].iter().all(|&s| s == 1));
}

// ─── Lifecycle ──────────────────────────────────────────────────────

#[test]
fn vad_state_resets_at_recording_start() {
    let base = Instant::now();
    let mut source = ScriptedSource::new(frame_script(base, &[(120, 0)]));
    let mut vad = FakeVad::new(Vec::new(), 0.0);
    let resets = vad.resets.clone();

    let _ = recorder().record(&mut source, &mut vad);
    assert_eq!(resets.load(Ordering::SeqCst), 1);
}
