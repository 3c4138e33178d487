use std::env;
use std::process::ExitCode;

use qrism::QRReader;

/// Minimal demo binary: decode the QR code(s) in an image file given on the
/// command line. Not a supported CLI surface, just something to point at a
/// PNG while hacking on the library.
fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: qrism <image-path>");
        return ExitCode::FAILURE;
    };

    let img = match image::open(&path) {
        Ok(img) => img.to_luma8(),
        Err(e) => {
            eprintln!("failed to open {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    match QRReader::read_all(&img) {
        Ok(symbols) if symbols.is_empty() => {
            eprintln!("no QR code found in {path}");
            ExitCode::FAILURE
        }
        Ok(symbols) => {
            for symbol in symbols {
                match String::from_utf8(symbol.bytes) {
                    Ok(text) => println!("{text}"),
                    Err(e) => println!("{:?}", e.as_bytes()),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("decode failed: {e}");
            ExitCode::FAILURE
        }
    }
}
