extern crate clap;

use std::fs;
use std::thread;

use crossbeam_channel::bounded;
use ctrlc;
use env_logger;
use log::{error, info};

use blockii_core::cpu::logging::{consume, EventFilter, EventLogger};
use blockii_core::cpu::Cpu;
use blockii_core::mem::{Loader, MainMemory};

const BANK_BYTES: usize = 1024 * 2;

fn fetch_config<'a>() -> clap::ArgMatches<'a> {
    let about = "Block II Apollo Guidance Computer emulator";
    let c = clap::App::new("blockii")
        .version("0.1")
        .about(about)
        .arg(
            clap::Arg::with_name("image")
                .index(1)
                .required(true)
                .help("core-rope image to run"),
        )
        .arg(
            clap::Arg::with_name("yaagc")
                .long("yaagc")
                .help("the image file is in the yaAGC format"),
        )
        .arg(
            clap::Arg::with_name("debug")
                .long("debug")
                .help("print instruction, sequence and timer events"),
        );
    c.get_matches()
}

fn load_image(path: &str, yaagc: bool) -> Option<MainMemory> {
    let mut raw = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            error!("failed to read core rope file {}: {}", path, e);
            return None;
        }
    };

    if yaagc {
        // the yaAGC bank order is 2, 3, 0, 1, 4, 5, ... so banks 0/1
        // and 2/3 swap places before the sequential load
        if raw.len() >= 4 * BANK_BYTES {
            let (head, _) = raw.split_at_mut(4 * BANK_BYTES);
            let (first, second) = head.split_at_mut(2 * BANK_BYTES);
            first.swap_with_slice(second);
        }
    }

    let mut mm = MainMemory::new();
    let mut loader = Loader::new(&mut mm, yaagc);
    if let Err(e) = loader.write(&raw) {
        error!("failed to load main memory: {}", e);
        return None;
    }

    Some(mm)
}

fn main() {
    env_logger::init();

    let matches = fetch_config();
    let image = matches.value_of("image").unwrap();
    let yaagc = matches.is_present("yaagc");
    let debug = matches.is_present("debug");

    let mm = match load_image(image, yaagc) {
        Some(mm) => mm,
        None => std::process::exit(1),
    };

    // Register a ctrl-c handler that pushes a signal to the run loop; a
    // second ctrl-c before the loop notices force-quits.
    let (ctrlc_tx, ctrlc_rx) = bounded(1);
    let res = ctrlc::set_handler(move || {
        if ctrlc_tx.is_full() {
            std::process::exit(-1);
        }
        let _res = ctrlc_tx.send(());
    });
    if let Err(e) = res {
        error!("unable to register signal handler: {}", e);
        return;
    }

    let filter = if debug {
        EventFilter::all()
    } else {
        EventFilter::default()
    };
    let (logger, log_rx) = EventLogger::channel(1000);
    let consumer = thread::spawn(move || consume(log_rx, filter));

    let mut cpu = Cpu::new(mm);
    cpu.attach_logger(logger);
    cpu.reset();

    let mut last_timestamp = std::time::Instant::now();
    loop {
        if !ctrlc_rx.is_empty() {
            break;
        }

        if last_timestamp.elapsed().as_millis() == 0 {
            thread::sleep(std::time::Duration::new(0, 5_000_000));
            continue;
        }

        // Pace the simulation against the wall clock: one MCT is about
        // 11.7us of machine time.
        let mut cycle_counter = 0i64;
        let expected_cycles = ((last_timestamp.elapsed().as_micros() as f64) / 11.7) as i64;
        while cycle_counter < expected_cycles {
            match cpu.step() {
                Ok(cycles) => cycle_counter += i64::from(cycles),
                Err(e) => panic!("cpu fault: {}", e),
            }
        }
        last_timestamp = std::time::Instant::now();
    }

    info!("halted after {} MCTs", cpu.total_mcts());
    drop(cpu);
    let _res = consumer.join();
}
