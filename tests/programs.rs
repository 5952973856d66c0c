use std::{
    cell::RefCell,
    fs,
    rc::Rc,
};

use chip8vm::{
    mem::RamError,
    run,
    Config,
    Emulator,
    Flow,
    Rom,
    RunConfig,
    RunnerEvent,
    Step,
    Trigger,
};

fn emulator_with(program: &[u8]) -> Emulator {
    let mut emulator = Emulator::with_seed(Config::default(), 42);
    emulator.load(program, 0x200).unwrap();
    emulator
}

#[test]
fn infinite_loop_runs_until_stopped() {
    let mut emulator = emulator_with(&[0x6A, 0x05, 0x12, 0x00]);
    let samples = Rc::new(RefCell::new(Vec::new()));

    let mut events: Vec<RunnerEvent> = (1..=40)
        .map(|cycle| {
            let samples = samples.clone();
            RunnerEvent::new(
                Trigger::Cycles(cycle),
                Box::new(move |emulator| {
                    samples.borrow_mut().push((emulator.register(0xA), emulator.pc()));
                    Flow::Continue
                }),
            )
        })
        .collect();
    events.push(RunnerEvent::stop_at(Trigger::Cycles(40)));

    let summary = run(&mut emulator, &RunConfig::default(), &mut events).unwrap();

    assert!(summary.stopped_by_event);
    assert_eq!(summary.cycles, 40);
    let samples = samples.borrow();
    assert_eq!(samples.len(), 40);
    for (i, (va, pc)) in samples.iter().enumerate() {
        assert_eq!(*va, 5);
        let expected = if i % 2 == 0 { 0x202 } else { 0x200 };
        assert_eq!(*pc, expected, "pc after step {}", i + 1);
    }
}

#[test]
fn nested_subroutines_unwind() {
    #[rustfmt::skip]
    let program = [
        0x22, 0x08,       // call a
        0x60, 0xAA,       // 0x202
        0x12, 0x04,       // 0x204: spin
        0x00, 0x00,
        0x22, 0x0E,       // 0x208 a: call b
        0x71, 0x01,
        0x00, 0xEE,
        0x71, 0x10,       // 0x20E b
        0x00, 0xEE,
    ];
    let mut emulator = emulator_with(&program);
    let mut trace = vec![];
    for _ in 0..7 {
        emulator.step().unwrap();
        trace.push((emulator.pc(), emulator.stack_pointer()));
    }
    assert_eq!(
        trace,
        vec![
            (0x208, 1),
            (0x20E, 2),
            (0x210, 2),
            (0x20A, 1),
            (0x20C, 1),
            (0x202, 0),
            (0x204, 0),
        ]
    );
    assert_eq!(emulator.register(0x1), 0x11);
    assert_eq!(emulator.register(0x0), 0xAA);
}

#[test]
fn key_wait_resumes_after_input_event() {
    #[rustfmt::skip]
    let program = [
        0xF5, 0x0A,       // V5 = key
        0x60, 0x01,
        0x12, 0x04,
    ];
    let mut emulator = emulator_with(&program);
    let mut events = vec![
        RunnerEvent::new(
            Trigger::Cycles(100),
            Box::new(|emulator| {
                assert_eq!(emulator.awaiting_key(), Some(0x5));
                assert_eq!(emulator.register(0x0), 0);
                emulator.set_key(0xB, true);
                Flow::Continue
            }),
        ),
        RunnerEvent::stop_at(Trigger::Cycles(110)),
    ];

    run(&mut emulator, &RunConfig::default(), &mut events).unwrap();

    assert_eq!(emulator.awaiting_key(), None);
    assert_eq!(emulator.register(0x5), 0xB);
    assert_eq!(emulator.register(0x0), 0x1);
}

#[test]
fn sound_timer_decays_under_runner() {
    // V0 = 3, sound = V0, spin
    let mut emulator = emulator_with(&[0x60, 0x03, 0xF0, 0x18, 0x12, 0x04]);
    let active = Rc::new(RefCell::new(vec![]));
    let mut events: Vec<RunnerEvent> = [2, 20, 40]
        .into_iter()
        .map(|cycle| {
            let active = active.clone();
            RunnerEvent::new(
                Trigger::Cycles(cycle),
                Box::new(move |emulator| {
                    active.borrow_mut().push(emulator.sound_timer());
                    Flow::Continue
                }),
            )
        })
        .collect();
    let config = RunConfig {
        cycles_per_second: 600,
        max_cycles: Some(60),
        ..RunConfig::default()
    };

    run(&mut emulator, &config, &mut events).unwrap();

    assert_eq!(*active.borrow(), vec![3, 1, 0]);
    assert!(!emulator.sound_active());
}

#[test]
fn rom_file_round_trip() {
    let path = std::env::temp_dir().join(format!("chip8vm-{}.ch8", std::process::id()));
    fs::write(&path, [0x6A, 0x05, 0x12, 0x00]).unwrap();

    let rom = Rom::load(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let mut emulator = Emulator::with_seed(Config::default(), 0);
    emulator.load_rom(&rom).unwrap();
    assert_eq!(emulator.step(), Ok(Step::Executed(0x6A05)));
    assert_eq!(emulator.register(0xA), 5);
}

#[test]
fn oversized_program_is_rejected() {
    let mut emulator = Emulator::with_seed(Config::default(), 0);
    let image = vec![0u8; 0xE01];
    assert_eq!(
        emulator.load(&image, 0x200),
        Err(RamError::ProgramTooLarge {
            size: 0xE01,
            available: 0xE00,
            base: 0x200
        })
    );
    assert_eq!(emulator.pc(), 0x200);
    assert!(emulator.memory()[0x200..].iter().all(|&b| b == 0));
}
