extern crate clap;

use std::fs::{remove_file, File};

use env_logger;
use log::error;

use blockii_core::asm::Assembler;

fn fetch_config<'a>() -> clap::ArgMatches<'a> {
    let about = "Two-pass assembler producing Block II AGC core-rope images";
    let c = clap::App::new("blockii assembler")
        .version("0.1")
        .about(about)
        .arg(
            clap::Arg::with_name("source")
                .long("source")
                .takes_value(true)
                .required(true)
                .help("the assembly source file"),
        )
        .arg(
            clap::Arg::with_name("output")
                .long("output")
                .takes_value(true)
                .default_value("image.bin")
                .help("the binary output file"),
        );
    c.get_matches()
}

fn main() {
    env_logger::init();

    let matches = fetch_config();
    let source = matches.value_of("source").unwrap();
    let output = matches.value_of("output").unwrap();

    let mut asm = Assembler::new();
    if asm.assemble(source) {
        let mut out = match File::create(output) {
            Ok(f) => f,
            Err(e) => {
                error!("failed to create output file: {}", e);
                std::process::exit(1);
            }
        };

        if let Err(e) = asm.write_out(&mut out) {
            error!("failed to write output file: {}", e);
            drop(out);
            if let Err(e) = remove_file(output) {
                error!("failed to remove partial output file: {}", e);
            }
            std::process::exit(1);
        }
    }

    for p in asm.problems() {
        println!("{}", p);
    }
}
