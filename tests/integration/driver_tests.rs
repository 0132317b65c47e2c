//! Integration tests for the LedDriver facade → allocator → PWM port path.

use std::sync::atomic::{AtomicBool, Ordering};

use ledc_fader::app::ports::{ChannelConfig, TimerConfig};
use ledc_fader::handoff::QUEUE_DEPTH;
use ledc_fader::led::ChannelId;
use ledc_fader::{ChannelAllocator, DriverError, HandoffQueue, HwError, LedConfig, LedDriver, LedMode};

use crate::mock_hw::{EventLog, MockPwm, PwmCall, PwmOp};

fn make_driver(config: LedConfig) -> (LedDriver<MockPwm>, ChannelAllocator, &'static HandoffQueue) {
    let queue: &'static HandoffQueue = Box::leak(Box::new(HandoffQueue::new()));
    let alloc = ChannelAllocator::new(&config);
    let driver = LedDriver::new(MockPwm::new(), queue, config).unwrap();
    (driver, alloc, queue)
}

// ── Creation ──────────────────────────────────────────────────

#[test]
fn first_create_installs_timer_then_configures_channel() {
    let (driver, alloc, _) = make_driver(LedConfig::default());
    let led = driver.create(&alloc, 5).unwrap();
    driver.create(&alloc, 6).unwrap();

    let ch0 = ChannelId::new(0);
    let ch1 = ChannelId::new(1);
    assert_eq!(
        driver.port().calls(),
        vec![
            PwmCall::ConfigureTimer(TimerConfig {
                timer_id: 1,
                resolution_bits: 13,
                frequency_hz: 5_000,
            }),
            PwmCall::InstallFadeService,
            PwmCall::ConfigureChannel(ChannelConfig {
                channel: ch0,
                gpio: 5,
                timer_id: 1,
                initial_duty: 0,
            }),
            PwmCall::RegisterFadeCallback {
                channel: ch0,
                led: led.id(),
            },
            PwmCall::ConfigureChannel(ChannelConfig {
                channel: ch1,
                gpio: 6,
                timer_id: 1,
                initial_duty: 0,
            }),
            PwmCall::RegisterFadeCallback {
                channel: ch1,
                led: ledc_fader::led::LedId::new(1),
            },
        ]
    );
}

#[test]
fn allocation_is_injective_until_exhausted() {
    let (driver, alloc, _) = make_driver(LedConfig::default());
    let mut channels = Vec::new();
    for gpio in 0..8 {
        let led = driver.create(&alloc, gpio).unwrap();
        channels.push(driver.channel(led).unwrap());
    }
    channels.sort();
    channels.dedup();
    assert_eq!(channels.len(), 8, "every LED must own a distinct channel");

    driver.port().clear_calls();
    assert_eq!(driver.create(&alloc, 20), Err(DriverError::ResourceExhausted));
    assert_eq!(alloc.allocated(), 8);
    assert!(driver.port().calls().is_empty(), "exhaustion must not touch hardware");
}

#[test]
fn smaller_pool_respected() {
    let (driver, alloc, _) = make_driver(LedConfig {
        max_channels: 2,
        ..LedConfig::default()
    });
    driver.create(&alloc, 1).unwrap();
    driver.create(&alloc, 2).unwrap();
    assert_eq!(driver.create(&alloc, 3), Err(DriverError::ResourceExhausted));
}

#[test]
fn duplicate_gpio_rejected() {
    let (driver, alloc, _) = make_driver(LedConfig::default());
    driver.create(&alloc, 9).unwrap();
    assert!(matches!(
        driver.create(&alloc, 9),
        Err(DriverError::InvalidArgument(_))
    ));
    assert_eq!(alloc.allocated(), 1);
}

#[test]
fn channel_config_failure_does_not_leak_a_channel() {
    let (driver, alloc, _) = make_driver(LedConfig::default());
    driver.port().fail_on(PwmOp::ConfigureChannel, HwError(0x102));
    assert_eq!(
        driver.create(&alloc, 4),
        Err(DriverError::AllocationFailure(HwError(0x102)))
    );
    assert_eq!(alloc.allocated(), 0);

    driver.port().heal();
    let led = driver.create(&alloc, 4).unwrap();
    assert_eq!(driver.channel(led), Ok(ChannelId::new(0)));
}

#[test]
fn callback_registration_failure_is_allocation_failure() {
    let (driver, alloc, _) = make_driver(LedConfig::default());
    driver.port().fail_on(PwmOp::RegisterFadeCallback, HwError(-1));
    assert_eq!(
        driver.create(&alloc, 4),
        Err(DriverError::AllocationFailure(HwError(-1)))
    );
    assert_eq!(alloc.allocated(), 0);
}

#[test]
fn timer_failure_is_retried_on_next_create() {
    let (driver, alloc, _) = make_driver(LedConfig::default());
    driver.port().fail_on(PwmOp::ConfigureTimer, HwError(0x103));
    assert_eq!(
        driver.create(&alloc, 4),
        Err(DriverError::AllocationFailure(HwError(0x103)))
    );
    assert_eq!(alloc.allocated(), 0);
    assert!(!alloc.is_installed());

    driver.port().heal();
    driver.create(&alloc, 4).unwrap();
    assert!(alloc.is_installed());
    assert_eq!(
        driver
            .port()
            .count(|c| matches!(c, PwmCall::ConfigureTimer(_))),
        1
    );
}

#[test]
fn concurrent_creates_install_timer_once() {
    let (driver, alloc, _) = make_driver(LedConfig::default());

    let mut channels: Vec<ChannelId> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|gpio| {
                let driver = driver.clone();
                let alloc = &alloc;
                s.spawn(move || {
                    let led = driver.create(alloc, gpio).unwrap();
                    driver.channel(led).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    channels.sort();
    channels.dedup();
    assert_eq!(channels.len(), 8);
    assert_eq!(
        driver
            .port()
            .count(|c| matches!(c, PwmCall::ConfigureTimer(_))),
        1
    );
    assert_eq!(
        driver
            .port()
            .count(|c| matches!(c, PwmCall::InstallFadeService)),
        1
    );
}

#[test]
fn fade_service_failure_is_allocation_failure() {
    let (driver, alloc, _) = make_driver(LedConfig::default());
    driver.port().fail_on(PwmOp::InstallFadeService, HwError(0x104));
    assert_eq!(
        driver.create(&alloc, 4),
        Err(DriverError::AllocationFailure(HwError(0x104)))
    );
}

#[test]
fn allocator_from_driver_config() {
    let (driver, _, _) = make_driver(LedConfig {
        max_channels: 3,
        ..LedConfig::default()
    });
    let alloc = driver.allocator();
    assert_eq!(alloc.capacity(), 3);
    driver.create(&alloc, 1).unwrap();

    let foreign = ChannelAllocator::new(&LedConfig::default());
    assert_eq!(
        driver.create(&foreign, 2),
        Err(DriverError::InvalidArgument("allocator"))
    );
}

#[test]
fn pin_out_of_range_rejected() {
    let (driver, alloc, _) = make_driver(LedConfig::default());
    assert_eq!(driver.create(&alloc, -3), Err(DriverError::InvalidArgument("gpio")));
    assert_eq!(driver.create(&alloc, 49), Err(DriverError::InvalidArgument("gpio")));
    assert!(driver.port().calls().is_empty());
}

// ── Requests ──────────────────────────────────────────────────

#[test]
fn invalid_intensity_mutates_nothing() {
    let (driver, alloc, queue) = make_driver(LedConfig::default());
    let led = driver.create(&alloc, 4).unwrap();
    let before = driver.params(led).unwrap();

    assert_eq!(
        driver.set_continuous(led, 101),
        Err(DriverError::InvalidArgument("intensity"))
    );
    assert_eq!(
        driver.set_fade(led, 255, 100),
        Err(DriverError::InvalidArgument("intensity"))
    );
    assert_eq!(driver.params(led).unwrap(), before);
    assert!(queue.is_empty());
}

#[test]
fn raw_mode_value_validated() {
    let (driver, alloc, queue) = make_driver(LedConfig::default());
    let led = driver.create(&alloc, 4).unwrap();

    let mode = LedMode::try_from(2).unwrap();
    driver.set_mode(led, mode, 75, 250).unwrap();
    assert_eq!(driver.mode(led), Ok(LedMode::Fade));
    assert_eq!(driver.target_duty(led), Ok(6143));
    assert_eq!(queue.len(), 1);

    assert_eq!(LedMode::try_from(9), Err(DriverError::InvalidArgument("mode")));
}

#[test]
fn saturated_queue_returns_queue_full_without_blocking() {
    let (driver, alloc, queue) = make_driver(LedConfig::default());
    let leds: Vec<_> = (0..8).map(|g| driver.create(&alloc, g).unwrap()).collect();

    for led in &leds {
        driver.set_continuous(*led, 10).unwrap();
        driver.set_fade(*led, 10, 100).unwrap();
    }
    assert_eq!(queue.len(), QUEUE_DEPTH);

    assert_eq!(driver.set_continuous(leds[0], 50), Err(DriverError::QueueFull));
    assert_eq!(queue.len(), QUEUE_DEPTH);
}

#[test]
fn rejected_request_leaves_stopped_led_untouched() {
    let (driver, alloc, queue) = make_driver(LedConfig::default());
    let a = driver.create(&alloc, 4).unwrap();
    let b = driver.create(&alloc, 5).unwrap();
    driver.stop(a).unwrap();
    let before = driver.params(a).unwrap();

    while !queue.is_full() {
        driver.set_continuous(b, 10).unwrap();
    }
    assert_eq!(driver.set_fade(a, 70, 100), Err(DriverError::QueueFull));
    assert_eq!(driver.start(a), Err(DriverError::QueueFull));

    assert_eq!(driver.params(a).unwrap(), before);
    assert_eq!(driver.is_running(a), Ok(false));
    assert_eq!(driver.mode(a), Ok(LedMode::Continuous));
}

#[test]
fn concurrent_submissions_last_whole_one_wins() {
    let (driver, alloc, _) = make_driver(LedConfig::default());
    let led = driver.create(&alloc, 4).unwrap();
    let mut worker = driver.worker(EventLog::new());
    let done = AtomicBool::new(false);

    // Thread t submits (mode, intensity, time) = (Fade or Continuous, 10 + t, 100 * (t + 1)).
    let submission = |t: u8| {
        let mode = if t % 2 == 0 { LedMode::Fade } else { LedMode::Continuous };
        (mode, 10 + t, 100 * (u32::from(t) + 1))
    };

    std::thread::scope(|s| {
        let drainer = s.spawn(|| {
            while !done.load(Ordering::Acquire) {
                worker.drain();
                std::thread::yield_now();
            }
        });

        let writers: Vec<_> = (0..6u8)
            .map(|t| {
                let driver = driver.clone();
                s.spawn(move || {
                    let (mode, intensity, time) = submission(t);
                    for _ in 0..200 {
                        let res = match mode {
                            LedMode::Fade => driver.set_fade(led, intensity, time),
                            _ => driver.set_mode(led, mode, intensity, time),
                        };
                        assert!(matches!(res, Ok(()) | Err(DriverError::QueueFull)));
                    }
                })
            })
            .collect();
        let results: Vec<_> = writers.into_iter().map(|w| w.join()).collect();
        done.store(true, Ordering::Release);
        drainer.join().unwrap();
        for r in results {
            r.unwrap();
        }
    });

    let p = driver.params(led).unwrap();
    let whole: Vec<_> = (0..6u8)
        .map(|t| {
            let (mode, intensity, time) = submission(t);
            (mode, driver.config().duty_for(intensity).unwrap(), time)
        })
        .collect();
    assert!(
        whole.contains(&(p.mode, p.target_duty, p.fade_time_ms)),
        "torn params: {p:?}"
    );
    assert!(p.running);
}

// ── Stop ──────────────────────────────────────────────────────

#[test]
fn stop_twice_programs_zero_twice() {
    let (driver, alloc, _) = make_driver(LedConfig::default());
    let led = driver.create(&alloc, 4).unwrap();
    driver.port().clear_calls();

    driver.stop(led).unwrap();
    driver.stop(led).unwrap();

    let ch = ChannelId::new(0);
    let once = [
        PwmCall::SetDuty { channel: ch, duty: 0 },
        PwmCall::UpdateDuty { channel: ch },
        PwmCall::Stop { channel: ch },
    ];
    let expected: Vec<PwmCall> = once.iter().chain(once.iter()).copied().collect();
    assert_eq!(driver.port().calls(), expected);
    assert_eq!(driver.is_running(led), Ok(false));
}

#[test]
fn stop_hw_failure_reported() {
    let (driver, alloc, _) = make_driver(LedConfig::default());
    let led = driver.create(&alloc, 4).unwrap();
    driver.port().fail_on(PwmOp::Stop, HwError(0x105));
    assert_eq!(driver.stop(led), Err(DriverError::Hw(HwError(0x105))));
}
