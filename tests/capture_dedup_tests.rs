// Capture dedup, sequence numbering, and first-sight log output.

use huella::capture::CaptureEngine;
use huella::entity::EntityId;
use huella::filter::FrameFilter;
use std::io::{self, Write};
use std::sync::{Arc, Barrier, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// Shared in-memory sink for asserting on emitted log lines
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> LogBuffer {
        self.clone()
    }
}

fn with_captured_logs(f: impl FnOnce()) -> String {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    buffer.contents()
}

/// Capturing the same call site N times records one entry and emits one
/// log line, regardless of N
#[test]
fn test_idempotent_dedup_single_log_line() {
    let engine = CaptureEngine::new(FrameFilter::permissive());
    let entity = EntityId::Name("dedup.same_site".to_string());

    let logs = with_captured_logs(|| {
        for _ in 0..5 {
            engine.capture(entity.clone());
        }
    });

    assert_eq!(engine.store().distinct_count(&entity), 1);
    assert_eq!(logs.matches("Logging new call stack").count(), 1);
}

/// First-sight log lines carry the sequence number, the entity display
/// name, and frames rendered in the File/line number/in format
#[test]
fn test_first_sight_log_format() {
    let engine = CaptureEngine::new(FrameFilter::permissive());
    let entity = EntityId::Name("dedup.formatted".to_string());

    let logs = with_captured_logs(|| engine.capture(entity.clone()));

    assert!(logs.contains("Logging new call stack #1 for dedup.formatted:"));
    assert!(logs.contains("File "));
    assert!(logs.contains(", line number "));
    assert!(logs.contains(", in "));
}

/// The Nth distinct stack is reported as #N; re-encountering an earlier
/// stack never increments the counter
#[test]
fn test_sequence_numbering_by_distinct_site() {
    let engine = CaptureEngine::new(FrameFilter::permissive());
    let entity = EntityId::Name("dedup.numbered".to_string());

    fn site_one(engine: &CaptureEngine, entity: &EntityId) {
        engine.capture(entity.clone());
    }
    fn site_two(engine: &CaptureEngine, entity: &EntityId) {
        engine.capture(entity.clone());
    }

    let logs = with_captured_logs(|| {
        // one call-site line, re-entered; only the first pass is novel
        for _ in 0..3 {
            site_one(&engine, &entity);
        }
        site_two(&engine, &entity);
    });

    assert_eq!(engine.store().distinct_count(&entity), 2);
    assert_eq!(logs.matches("Logging new call stack #1 for").count(), 1);
    assert_eq!(logs.matches("Logging new call stack #2 for").count(), 1);
    assert!(!logs.contains("Logging new call stack #3"));
}

/// Per-entity isolation: the same call site recorded under two entities
/// yields one entry for each
#[test]
fn test_entities_deduplicate_independently() {
    let engine = CaptureEngine::new(FrameFilter::permissive());
    let first = EntityId::Name("dedup.first".to_string());
    let second = EntityId::Name("dedup.second".to_string());

    fn shared_site(engine: &CaptureEngine, entity: &EntityId) {
        engine.capture(entity.clone());
    }

    // one call-site line serving both entities, with a repeat for the first
    for entity in [&first, &second, &first] {
        shared_site(&engine, entity);
    }

    assert_eq!(engine.store().distinct_count(&first), 1);
    assert_eq!(engine.store().distinct_count(&second), 1);
}

/// track_till_now-style reporting replays history without mutating it
#[test]
fn test_report_replays_recorded_history() {
    let engine = CaptureEngine::new(FrameFilter::permissive());
    let entity = EntityId::Name("dedup.reported".to_string());
    engine.capture(entity.clone());

    let logs = with_captured_logs(|| engine.report(std::slice::from_ref(&entity)));

    assert!(logs.contains("Logging unique call stacks of dedup.reported:"));
    assert_eq!(engine.store().distinct_count(&entity), 1);

    let silent = with_captured_logs(|| {
        engine.report(&[EntityId::Name("dedup.never_seen".to_string())]);
    });
    assert!(!silent.contains("Logging unique call stacks"));
}

/// M threads capturing the same entity from the same call site record
/// exactly one entry between them
#[test]
fn test_concurrent_capture_records_once() {
    let engine = Arc::new(CaptureEngine::new(FrameFilter::permissive()));
    let entity = EntityId::Name("dedup.concurrent".to_string());
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let entity = entity.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                engine.capture(entity);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.store().distinct_count(&entity), 1);
}
