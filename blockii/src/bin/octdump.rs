extern crate clap;

use std::fs;

use env_logger;
use log::error;

fn fetch_config<'a>() -> clap::ArgMatches<'a> {
    let c = clap::App::new("blockii octal dump")
        .version("0.1")
        .about("Dumps a core-rope image as big-endian octal words")
        .arg(
            clap::Arg::with_name("source")
                .long("source")
                .takes_value(true)
                .required(true)
                .help("the image file to dump"),
        );
    c.get_matches()
}

fn main() {
    env_logger::init();

    let matches = fetch_config();
    let source = matches.value_of("source").unwrap();

    let bytes = match fs::read(source) {
        Ok(b) => b,
        Err(e) => {
            error!("failed to read {}: {}", source, e);
            std::process::exit(1);
        }
    };

    let mut chunks = bytes.chunks_exact(2);
    let mut off = 0usize;
    for c in &mut chunks {
        let v = u16::from_be_bytes([c[0], c[1]]);
        println!("{:05o}: {:05o}", off, v);
        off += 1;
    }

    if let [b] = chunks.remainder() {
        println!("{:05o}: {:05o} (truncated)", off, (*b as u16) << 8);
    }
}
