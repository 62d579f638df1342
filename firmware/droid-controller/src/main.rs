mod rig;

use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_svc::timer::EspTaskTimerService;
use log::{error, info};
use servo_dispatch::{
    ExpanderBackend, MoveTiming, PwmBackend, ServoDispatcher, ServoMask,
};

fn main() {
    // Initialize ESP-IDF logging and system
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init().expect("Failed to init logger");

    info!("Droid Controller v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take().expect("Failed to take peripherals");

    // Dome rig: panel servos behind a PCA9685 on I2C.
    let i2c_config = I2cConfig::new().baudrate(400.kHz().into());
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio4, // SDA
        peripherals.pins.gpio5, // SCL
        &i2c_config,
    )
    .expect("Failed to init I2C");

    let dome_backend =
        ExpanderBackend::new(i2c, rig::DOME_EXPANDER_ADDR).expect("Failed to bind PCA9685");
    let dome = Arc::new(ServoDispatcher::new(dome_backend));
    dome.configure(&rig::DOME_SERVOS)
        .expect("Failed to configure dome rig");

    // Holoprojector rig: two axes driven directly from LEDC channels. The
    // timer is leaked so the drivers (and the dispatcher holding them) can
    // outlive main's stack frame.
    let timer_config = TimerConfig::default().frequency(50.Hz().into());
    let timer: &'static LedcTimerDriver<'static> = Box::leak(Box::new(
        LedcTimerDriver::new(peripherals.ledc.timer0, &timer_config)
            .expect("Failed to init LEDC timer"),
    ));
    let holo_h = LedcDriver::new(peripherals.ledc.channel0, timer, peripherals.pins.gpio6)
        .expect("Failed to init LEDC channel 0");
    let holo_v = LedcDriver::new(peripherals.ledc.channel1, timer, peripherals.pins.gpio7)
        .expect("Failed to init LEDC channel 1");

    let holo = Arc::new(ServoDispatcher::new(PwmBackend::new(vec![holo_h, holo_v])));
    holo.configure(&rig::HOLO_SERVOS)
        .expect("Failed to configure holo rig");

    // Fixed-period tick off a timer-service task. All motion advances in
    // the callback; the foreground only installs movement descriptors.
    let timer_service = EspTaskTimerService::new().expect("Failed to init timer service");
    let tick_timer = {
        let dome = dome.clone();
        let holo = holo.clone();
        timer_service
            .timer(move || {
                dome.tick();
                holo.tick();
            })
            .expect("Failed to create tick timer")
    };
    tick_timer
        .every(Duration::from_millis(rig::TICK_PERIOD_MS as u64))
        .expect("Failed to start tick timer");

    info!("Rigs configured: dome={} holo={}", dome.num_servos(), holo.num_servos());

    // Idle animation until a command source is wired up: panel waves on the
    // dome, nervous jitter on the holoprojectors.
    loop {
        info!("Sequence: alternating panel wave");
        if let Err(e) = dome.move_servo_set_to(
            rig::DOME_PANELS,
            rig::PANELS_ODD,
            MoveTiming::over(600),
            2200,
            700,
        ) {
            error!("Panel wave failed: {:?}", e);
        }
        sleep(Duration::from_millis(1200));
        if let Err(e) = dome.move_servo_set_to(
            rig::DOME_PANELS,
            rig::PANELS_ODD,
            MoveTiming::over(600),
            700,
            2200,
        ) {
            error!("Panel wave failed: {:?}", e);
        }
        sleep(Duration::from_millis(1200));

        info!("Sequence: pie panel flutter");
        // Randomized durations desynchronize the panels on purpose.
        if let Err(e) = dome.move_servos_to(rig::PIE_PANELS, MoveTiming::ranged(0, 300, 900), 2100) {
            error!("Pie flutter failed: {:?}", e);
        }
        sleep(Duration::from_millis(1000));
        if let Err(e) = dome.move_servos_to(rig::PIE_PANELS, MoveTiming::ranged(0, 300, 900), 800) {
            error!("Pie flutter failed: {:?}", e);
        }
        sleep(Duration::from_millis(1000));

        info!("Sequence: close all panels");
        if let Err(e) = dome.move_servos_to(rig::DOME_PANELS, MoveTiming::over(400), 600) {
            error!("Panel close failed: {:?}", e);
        }
        sleep(Duration::from_millis(800));

        for _ in 0..4 {
            if let Err(e) = holo.move_servos_by(rig::HOLO_ALL, MoveTiming::ranged(0, 100, 250), 150)
            {
                error!("Holo jitter failed: {:?}", e);
            }
            sleep(Duration::from_millis(400));
            if let Err(e) =
                holo.move_servos_by(rig::HOLO_ALL, MoveTiming::ranged(0, 100, 250), -150)
            {
                error!("Holo jitter failed: {:?}", e);
            }
            sleep(Duration::from_millis(400));
        }

        // Recenter the holoprojectors between cycles.
        if let Err(e) = holo.move_servos_to(ServoMask::ALL, MoveTiming::over(300), 1500) {
            error!("Holo recenter failed: {:?}", e);
        }
        sleep(Duration::from_millis(2000));
    }
}
