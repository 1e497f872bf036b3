use std::thread;
use std::time::Duration;

use pacer_core::frame::FrameStats;
use pacer_core::scheduler::{FrameScheduler, TickTarget};
use pacer_core::time::{Clock, ManualClock, SystemClock};
use pacer_core::EngineResult;

struct Sleeper {
    work: Duration,
    ticks: Vec<FrameStats>,
    limit: usize,
    stop: pacer_core::signals::ShutdownFlag,
}

impl TickTarget for Sleeper {
    fn init(&mut self) -> EngineResult<()> {
        Ok(())
    }

    fn tick(&mut self, stats: &FrameStats) -> EngineResult<()> {
        if stats.total_frames_rendered > 0 {
            self.ticks.push(*stats);
        }
        if !self.work.is_zero() {
            thread::sleep(self.work);
        }
        if self.ticks.len() >= self.limit {
            self.stop.set();
        }
        Ok(())
    }

    fn destroy(&mut self) -> EngineResult<()> {
        Ok(())
    }
}

fn run_real(hz: f64, work: Duration, limit: usize) -> Vec<FrameStats> {
    pacer_core::logsys::init_for_tests();
    let mut scheduler = FrameScheduler::new(hz, SystemClock::new()).unwrap();
    let mut target = Sleeper {
        work,
        ticks: Vec::new(),
        limit,
        stop: scheduler.shutdown_flag(),
    };
    scheduler.run(&mut target).unwrap();
    target.ticks
}

#[test]
fn real_clock_converges_on_sixty_hertz() {
    let ticks = run_real(60.0, Duration::ZERO, 60);
    let target = 1000.0 / 60.0;

    for t in &ticks {
        assert!(t.cooked_frame_time_ms >= target, "{t:?}");
        assert!(!t.is_lagging(), "{t:?}");
    }
    let mean = ticks.iter().map(|t| t.cooked_frame_time_ms).sum::<f64>() / ticks.len() as f64;
    assert!(mean < target + 2.0, "mean cooked {mean:.3} ms");
}

#[test]
fn slow_host_is_reported_as_lagging() {
    let ticks = run_real(60.0, Duration::from_millis(20), 5);
    for t in &ticks {
        assert!(t.is_lagging(), "{t:?}");
        assert!(t.raw_frame_time_ms >= 20.0);
        // No sleep was added on top of the overrun.
        assert!(t.cooked_frame_time_ms - t.raw_frame_time_ms < 1.0);
    }
}

#[test]
fn manual_clock_holds_the_period_exactly_over_many_ticks() {
    let clock = ManualClock::new().with_default_overshoot(0.6);
    let mut scheduler = FrameScheduler::new(60.0, clock.clone()).unwrap();
    scheduler.calibrate_guard();
    let target = scheduler.target_frame_time_ms();

    let start = clock.now_ms();
    for i in 0..120 {
        let work = clock.clone();
        scheduler
            .tick(|_| {
                work.advance((i % 7) as f64);
                Ok(())
            })
            .unwrap();
        let stats = scheduler.stats();
        assert!(stats.cooked_frame_time_ms >= target);
        assert!(stats.cooked_frame_time_ms < target + 0.02);
    }
    let elapsed = clock.now_ms() - start;
    assert!((elapsed / 120.0 - target).abs() < 0.02);
    assert_eq!(scheduler.stats().total_frames_rendered, 120);
}

#[test]
fn spawned_loop_stops_and_joins() {
    let scheduler = FrameScheduler::new(120.0, SystemClock::new()).unwrap();
    let target = Sleeper {
        work: Duration::ZERO,
        ticks: Vec::new(),
        limit: usize::MAX,
        stop: scheduler.shutdown_flag(),
    };
    let handle = scheduler.spawn(target).unwrap();
    while handle.stats().total_frames_rendered < 3 {
        thread::sleep(Duration::from_millis(2));
    }
    assert!(handle.stats().running);
    handle.stop();
    handle.join().unwrap();
}
