use std::sync::Arc;

use parking_lot::Mutex;

use pacer_core::engine::run_headless_with_clock;
use pacer_core::time::ManualClock;
use pacer_core::{Backbuffer, Color, EngineConfig, HostBridge, InputLatch, KeyCode};

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

struct Counter {
    journal: Journal,
    frame: u32,
}

impl HostBridge for Counter {
    fn init(&mut self) -> anyhow::Result<()> {
        self.journal.push("init");
        Ok(())
    }

    fn update(&mut self, input: &InputLatch) -> anyhow::Result<()> {
        assert!(!input.is_pressed(KeyCode::Space));
        self.frame += 1;
        self.journal.push(format!("update {}", self.frame));
        Ok(())
    }

    fn render(&mut self, target: &mut Backbuffer) -> anyhow::Result<()> {
        let shade = (self.frame * 40).min(255) as u8;
        target.draw().clear(Color::rgb(shade, shade, shade));
        self.journal.push(format!("render {}", self.frame));
        Ok(())
    }

    fn destroy(&mut self) -> anyhow::Result<()> {
        self.journal.push("destroy");
        Ok(())
    }
}

fn config() -> EngineConfig {
    pacer_core::logsys::init_for_tests();
    EngineConfig::from_toml(
        r#"
        logical_width = 16
        logical_height = 12
        target_hz = 50.0
        log_fps = false
        debug_overlay = "none"
        "#,
    )
    .unwrap()
}

#[test]
fn ticks_run_strictly_in_sequence() {
    let journal = Journal::default();
    let host = Counter {
        journal: journal.clone(),
        frame: 0,
    };

    let (host, stats) = run_headless_with_clock(&config(), host, 4, ManualClock::new()).unwrap();

    assert_eq!(host.frame, 4);
    assert_eq!(
        journal.entries(),
        vec![
            "init", "update 1", "render 1", "update 2", "render 2", "update 3", "render 3",
            "update 4", "render 4", "destroy",
        ]
    );
    assert_eq!(stats.total_frames_rendered, 4);
    assert!(stats.cooked_frame_time_ms >= 20.0);
}

#[test]
fn real_clock_headless_run_finishes() {
    let journal = Journal::default();
    let host = Counter {
        journal: journal.clone(),
        frame: 0,
    };
    let (_, stats) = pacer_core::run_headless(&config(), host, 5).unwrap();
    assert_eq!(stats.total_frames_rendered, 5);
    assert_eq!(journal.entries().last().map(String::as_str), Some("destroy"));
}
