use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shared::voice::{
    RecognitionOptions, SpeechEngine, SpeechFuture, SpeechOutcome, Utterance, Voice, VoiceBridge,
    VoiceError, VoiceGender,
};
use tokio::sync::oneshot;

/// Engine whose utterances and recognitions complete only when the test says so.
#[derive(Default)]
struct FakeSpeechEngine {
    voices: Vec<Voice>,
    spoken: Mutex<Vec<Utterance>>,
    pending_speech: Mutex<Option<oneshot::Sender<Result<(), String>>>>,
    pending_recognition: Mutex<Option<oneshot::Sender<Result<String, String>>>>,
    cancel_calls: AtomicUsize,
    recognize_calls: AtomicUsize,
    stop_recognition_calls: AtomicUsize,
}

impl FakeSpeechEngine {
    fn with_voices(voices: Vec<Voice>) -> Self {
        Self {
            voices,
            ..Self::default()
        }
    }

    fn spoken_texts(&self) -> Vec<String> {
        self.spoken
            .lock()
            .expect("spoken lock")
            .iter()
            .map(|utterance| utterance.text.clone())
            .collect()
    }

    fn finish_speech(&self, result: Result<(), String>) {
        let sender = self
            .pending_speech
            .lock()
            .expect("speech lock")
            .take()
            .expect("an utterance should be pending");
        let _ = sender.send(result);
    }

    fn deliver_transcript(&self, transcript: &str) {
        let sender = self
            .pending_recognition
            .lock()
            .expect("recognition lock")
            .take()
            .expect("a recognition should be pending");
        let _ = sender.send(Ok(transcript.to_string()));
    }
}

impl SpeechEngine for FakeSpeechEngine {
    fn supports_synthesis(&self) -> bool {
        true
    }

    fn supports_recognition(&self) -> bool {
        true
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&self, utterance: Utterance) -> SpeechFuture<()> {
        let (tx, rx) = oneshot::channel();
        self.spoken.lock().expect("spoken lock").push(utterance);
        *self.pending_speech.lock().expect("speech lock") = Some(tx);
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err("utterance dropped".to_string()))
        })
    }

    fn cancel_speech(&self) {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(sender) = self.pending_speech.lock().expect("speech lock").take() {
            let _ = sender.send(Err("interrupted".to_string()));
        }
    }

    fn recognize(&self, _options: RecognitionOptions) -> SpeechFuture<String> {
        let (tx, rx) = oneshot::channel();
        self.recognize_calls.fetch_add(1, Ordering::SeqCst);
        *self.pending_recognition.lock().expect("recognition lock") = Some(tx);
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err("recognition dropped".to_string()))
        })
    }

    fn stop_recognition(&self) {
        self.stop_recognition_calls.fetch_add(1, Ordering::SeqCst);
    }
}

async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition should be reached in time");
}

fn bridge_with(engine: &Arc<FakeSpeechEngine>) -> Arc<VoiceBridge> {
    Arc::new(VoiceBridge::new(engine.clone()))
}

#[tokio::test]
async fn second_speak_supersedes_first_without_error() {
    let engine = Arc::new(FakeSpeechEngine::default());
    let bridge = bridge_with(&engine);

    let first = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.speak("A").await }
    });
    wait_until(|| engine.spoken_texts().len() == 1).await;

    let second = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.speak("B").await }
    });
    wait_until(|| engine.spoken_texts().len() == 2).await;

    assert_eq!(
        first.await.expect("first task should join"),
        Ok(SpeechOutcome::Superseded)
    );

    engine.finish_speech(Ok(()));
    assert_eq!(
        second.await.expect("second task should join"),
        Ok(SpeechOutcome::Finished)
    );
    assert_eq!(engine.spoken_texts(), vec!["A".to_string(), "B".to_string()]);
}

#[tokio::test]
async fn stop_speaking_supersedes_pending_utterance() {
    let engine = Arc::new(FakeSpeechEngine::default());
    let bridge = bridge_with(&engine);

    let pending = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.speak("long answer").await }
    });
    wait_until(|| engine.spoken_texts().len() == 1).await;

    bridge.stop_speaking();

    assert_eq!(
        pending.await.expect("task should join"),
        Ok(SpeechOutcome::Superseded)
    );
}

#[tokio::test]
async fn engine_failure_surfaces_as_synthesis_error() {
    let engine = Arc::new(FakeSpeechEngine::default());
    let bridge = bridge_with(&engine);

    let pending = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.speak("hello").await }
    });
    wait_until(|| engine.spoken_texts().len() == 1).await;
    engine.finish_speech(Err("audio-busy".to_string()));

    let err = pending
        .await
        .expect("task should join")
        .expect_err("engine failure should surface");
    assert_eq!(err, VoiceError::Synthesis("audio-busy".to_string()));
    assert_eq!(err.to_string(), "Speech error: audio-busy");
}

#[tokio::test]
async fn utterances_use_fixed_voice_parameters_and_preferred_voice() {
    let engine = Arc::new(FakeSpeechEngine::with_voices(vec![
        Voice {
            name: "Daniel".to_string(),
            lang: "en-GB".to_string(),
            gender: Some(VoiceGender::Male),
        },
        Voice {
            name: "Karen".to_string(),
            lang: "en-AU".to_string(),
            gender: None,
        },
    ]));
    let bridge = bridge_with(&engine);

    let pending = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.speak("hello").await }
    });
    wait_until(|| engine.spoken_texts().len() == 1).await;
    engine.finish_speech(Ok(()));
    pending
        .await
        .expect("task should join")
        .expect("speech should finish");

    let spoken = engine.spoken.lock().expect("spoken lock").clone();
    let utterance = &spoken[0];
    assert_eq!(
        utterance.voice.as_ref().map(|voice| voice.name.as_str()),
        Some("Karen")
    );
    assert!((utterance.rate - 0.9).abs() < f32::EPSILON);
    assert!((utterance.pitch - 1.1).abs() < f32::EPSILON);
    assert!((utterance.volume - 0.8).abs() < f32::EPSILON);
}

#[tokio::test]
async fn second_listen_fails_without_disturbing_the_first() {
    let engine = Arc::new(FakeSpeechEngine::default());
    let bridge = bridge_with(&engine);

    let first = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.start_listening().await }
    });
    wait_until(|| engine.recognize_calls.load(Ordering::SeqCst) == 1).await;
    assert!(bridge.is_listening());

    assert_eq!(
        bridge.start_listening().await,
        Err(VoiceError::AlreadyListening)
    );
    assert!(bridge.is_listening());
    assert_eq!(engine.recognize_calls.load(Ordering::SeqCst), 1);

    engine.deliver_transcript("remind me at noon");
    assert_eq!(
        first.await.expect("task should join"),
        Ok("remind me at noon".to_string())
    );
    assert!(!bridge.is_listening());
}

#[tokio::test]
async fn stop_listening_rejects_pending_session_and_allows_a_new_one() {
    let engine = Arc::new(FakeSpeechEngine::default());
    let bridge = bridge_with(&engine);

    let pending = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.start_listening().await }
    });
    wait_until(|| engine.recognize_calls.load(Ordering::SeqCst) == 1).await;

    bridge.stop_listening();

    assert_eq!(
        pending.await.expect("task should join"),
        Err(VoiceError::ListeningStopped)
    );
    assert_eq!(engine.stop_recognition_calls.load(Ordering::SeqCst), 1);
    assert!(!bridge.is_listening());

    let next = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.start_listening().await }
    });
    wait_until(|| engine.recognize_calls.load(Ordering::SeqCst) == 2).await;
    engine.deliver_transcript("again");
    assert_eq!(next.await.expect("task should join"), Ok("again".to_string()));
}

#[tokio::test]
async fn stop_listening_without_session_is_a_no_op() {
    let engine = Arc::new(FakeSpeechEngine::default());
    let bridge = bridge_with(&engine);

    bridge.stop_listening();

    assert_eq!(engine.stop_recognition_calls.load(Ordering::SeqCst), 0);
    assert!(!bridge.is_listening());
}
