use base64::Engine;
use reading_tutor::audio::AudioFrame;
use reading_tutor::nats::messages::{AudioFrameMessage, TranscriptMessage};
use reading_tutor::nats::source::fragment_from_transcript;

fn transcript(session_id: &str, text: &str, partial: bool) -> TranscriptMessage {
    TranscriptMessage {
        session_id: session_id.to_string(),
        text: text.to_string(),
        partial,
        timestamp: "2025-10-27T14:30:05Z".to_string(),
        confidence: None,
    }
}

#[test]
fn test_audio_frame_message_wire_format() {
    let msg = AudioFrameMessage {
        session_id: "reading-test".to_string(),
        sequence: 0,
        pcm: base64::engine::general_purpose::STANDARD.encode([0u8; 100]),
        sample_rate: 16000,
        channels: 1,
        timestamp: "2025-10-27T14:30:00Z".to_string(),
        final_frame: false,
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("reading-test"));
    assert!(json.contains("\"final\":false"));
    assert!(json.contains("\"sequence\":0"));

    let deserialized: AudioFrameMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.sample_rate, 16000);
    assert!(!deserialized.final_frame);
}

#[test]
fn test_transcript_without_optional_fields() {
    let json = r#"{
        "session_id": "reading-test",
        "text": "the cat sat",
        "timestamp": "2025-10-27T14:30:05Z"
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert_eq!(msg.text, "the cat sat");
    assert!(!msg.partial);
    assert_eq!(msg.confidence, None);
}

#[test]
fn test_transcript_with_confidence() {
    let json = r#"{
        "session_id": "reading-test",
        "text": "on the mat",
        "partial": true,
        "timestamp": "2025-10-27T14:30:05Z",
        "confidence": 0.87
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert!(msg.partial);
    assert_eq!(msg.confidence, Some(0.87));
}

#[test]
fn test_only_final_transcripts_for_this_session_become_fragments() {
    let session = "reading-test";

    assert_eq!(
        fragment_from_transcript(&transcript(session, "  the cat ", false), session),
        Some("the cat".to_string())
    );
    assert_eq!(fragment_from_transcript(&transcript(session, "the ca", true), session), None);
    assert_eq!(fragment_from_transcript(&transcript("reading-other", "dog", false), session), None);
    assert_eq!(fragment_from_transcript(&transcript(session, "   ", false), session), None);
}

#[test]
fn test_frame_pcm_survives_base64() {
    let frame = AudioFrame {
        samples: vec![100, -200, 300, -400],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: 0,
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(frame.to_pcm_bytes());
    let decoded = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
    let samples: Vec<i16> = decoded
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();

    assert_eq!(samples, frame.samples);
}
