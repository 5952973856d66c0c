use std::{
    thread,
    time::{
        Duration,
        Instant,
    },
};

use anyhow::{
    Context,
    Error,
};
use log::info;

pub mod constants;
pub mod display;
pub mod emulator;
pub mod mem;
pub mod process;

pub use emulator::{
    Config,
    Emulator,
    Interpreter,
    Step,
};
pub use mem::Rom;
pub use process::ProcessingError;

/// When a [`RunnerEvent`] fires. Time is emulated time, derived from the
/// step count and the configured instruction rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    Cycles(u64),
    TimerSeconds(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub type EventAction = Box<dyn FnMut(&mut Emulator) -> Flow>;

/// A one-shot callback scheduled against the run loop.
pub struct RunnerEvent {
    trigger: Trigger,
    action: EventAction,
    fired: bool,
}

impl RunnerEvent {
    pub fn new(trigger: Trigger, action: EventAction) -> Self {
        Self {
            trigger,
            action,
            fired: false,
        }
    }

    /// Stops the run once `trigger` is reached.
    pub fn stop_at(trigger: Trigger) -> Self {
        Self::new(trigger, Box::new(|_| Flow::Stop))
    }

    pub fn fired(&self) -> bool {
        self.fired
    }

    fn due(&self, cycles: u64, seconds: f64) -> bool {
        match self.trigger {
            Trigger::Cycles(n) => cycles >= n,
            Trigger::TimerSeconds(s) => seconds >= s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Sleep so emulated time keeps up with the wall clock.
    RealTime,
    Unthrottled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub cycles_per_second: u32,
    pub max_cycles: Option<u64>,
    pub pacing: Pacing,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cycles_per_second: constants::INSTRUCTIONS_PER_SECOND,
            max_cycles: None,
            pacing: Pacing::Unthrottled,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub timer_ticks: u64,
    pub unknown_opcodes: u64,
    pub stopped_by_event: bool,
}

/// Drives `emulator` until an event stops it, `max_cycles` is reached or a
/// step fails. Timers tick whenever emulated time crosses a 1/60 s boundary.
pub fn run(emulator: &mut Emulator, config: &RunConfig, events: &mut [RunnerEvent]) -> Result<RunSummary, Error> {
    let cycles_per_second = config.cycles_per_second.max(1);
    let start = Instant::now();
    let mut summary = RunSummary::default();

    info!(
        "running at {cycles_per_second} Hz ({:?}), limit {:?}",
        config.pacing, config.max_cycles
    );

    loop {
        if config.max_cycles.is_some_and(|max| summary.cycles >= max) {
            break;
        }

        let step = emulator
            .step()
            .with_context(|| format!("step {} failed at {:#05x}", summary.cycles, emulator.pc()))?;
        summary.cycles += 1;
        if let Step::UnknownOpcode(_) = step {
            summary.unknown_opcodes += 1;
        }

        let ticks_due = summary.cycles * constants::TIMER_HZ as u64 / cycles_per_second as u64;
        while summary.timer_ticks < ticks_due {
            emulator.tick_timers();
            summary.timer_ticks += 1;
        }

        let seconds = summary.cycles as f64 / cycles_per_second as f64;
        for event in events.iter_mut() {
            if event.fired || !event.due(summary.cycles, seconds) {
                continue;
            }
            event.fired = true;
            if (event.action)(emulator) == Flow::Stop {
                summary.stopped_by_event = true;
            }
        }
        if summary.stopped_by_event {
            break;
        }

        if let Pacing::RealTime = config.pacing {
            let target = start + Duration::from_secs_f64(seconds);
            let now = Instant::now();
            if target > now {
                thread::sleep(target - now);
            }
        }
    }

    info!("stopped after {} cycles, {} timer ticks", summary.cycles, summary.timer_ticks);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::{
        cell::Cell,
        rc::Rc,
    };

    use super::*;

    fn emulator_with(program: &[u8]) -> Emulator {
        let mut emulator = Emulator::with_seed(Config::default(), 1);
        emulator.load(program, constants::MEMORY_OFFSET).unwrap();
        emulator
    }

    #[test]
    fn stops_at_max_cycles() {
        let mut emulator = emulator_with(&[0x12, 0x00]);
        let config = RunConfig {
            max_cycles: Some(120),
            ..RunConfig::default()
        };
        let summary = run(&mut emulator, &config, &mut []).unwrap();
        assert_eq!(summary.cycles, 120);
        assert_eq!(summary.timer_ticks, 10);
        assert!(!summary.stopped_by_event);
    }

    #[test]
    fn one_emulated_second_is_sixty_ticks() {
        for cycles_per_second in [700, 500, 1000, 30] {
            let mut emulator = emulator_with(&[0x12, 0x00]);
            let config = RunConfig {
                cycles_per_second,
                max_cycles: Some(cycles_per_second as u64),
                ..RunConfig::default()
            };
            let summary = run(&mut emulator, &config, &mut []).unwrap();
            assert_eq!(summary.timer_ticks, 60, "at {cycles_per_second} Hz");
        }
    }

    #[test]
    fn timers_tick_at_sixty_hertz_of_emulated_time() {
        // V0 = 60, delay = V0, spin
        let mut emulator = emulator_with(&[0x60, 0x3C, 0xF0, 0x15, 0x12, 0x04]);
        let config = RunConfig {
            cycles_per_second: 600,
            max_cycles: Some(300),
            ..RunConfig::default()
        };
        run(&mut emulator, &config, &mut []).unwrap();
        assert_eq!(emulator.delay_timer(), 30);
    }

    #[test]
    fn key_wait_steps_are_counted_like_the_emulator() {
        let mut emulator = emulator_with(&[0xF0, 0x0A, 0x12, 0x02]);
        let mut events = vec![RunnerEvent::new(
            Trigger::Cycles(50),
            Box::new(|emulator| {
                emulator.set_key(0x2, true);
                Flow::Continue
            }),
        )];
        let config = RunConfig {
            max_cycles: Some(80),
            ..RunConfig::default()
        };
        let summary = run(&mut emulator, &config, &mut events).unwrap();
        assert_eq!(summary.cycles, 80);
        assert_eq!(emulator.cycles(), summary.cycles);
        assert_eq!(emulator.register(0x0), 0x2);
    }

    #[test]
    fn events_fire_once_in_order() {
        let mut emulator = emulator_with(&[0x70, 0x01, 0x12, 0x00]);
        let seen = Rc::new(Cell::new(0u8));
        let mut events = vec![
            RunnerEvent::new(Trigger::Cycles(10), {
                let seen = seen.clone();
                Box::new(move |emulator| {
                    seen.set(emulator.register(0x0));
                    Flow::Continue
                })
            }),
            RunnerEvent::stop_at(Trigger::TimerSeconds(1.0)),
        ];
        let summary = run(&mut emulator, &RunConfig::default(), &mut events).unwrap();
        assert_eq!(seen.get(), 5);
        assert!(events.iter().all(RunnerEvent::fired));
        assert!(summary.stopped_by_event);
        assert_eq!(summary.cycles, constants::INSTRUCTIONS_PER_SECOND as u64);
    }

    #[test]
    fn counts_unknown_opcodes() {
        let mut emulator = emulator_with(&[0x0F, 0xFF, 0x12, 0x00]);
        let config = RunConfig {
            max_cycles: Some(10),
            ..RunConfig::default()
        };
        let summary = run(&mut emulator, &config, &mut []).unwrap();
        assert_eq!(summary.unknown_opcodes, 5);
    }

    #[test]
    fn stack_fault_surfaces_as_error() {
        let mut emulator = emulator_with(&[0x22, 0x00]);
        let err = run(&mut emulator, &RunConfig::default(), &mut []).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProcessingError>(),
            Some(ProcessingError::StackOverflow { .. })
        ));
        assert_eq!(emulator.stack_pointer(), constants::STACK_DEPTH);
    }
}
