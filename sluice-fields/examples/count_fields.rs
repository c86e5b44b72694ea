//! Counts the fields and records of comma-separated input on stdin.

use std::io::BufReader;

use sluice::ReadSource;
use sluice_fields::{parse_field, Options, Span};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = Options::builder().delimiter(b',').build()?;

    let stdin = std::io::stdin();
    let mut src = ReadSource::from_buf_reader(BufReader::new(stdin.lock()));

    let mut fields = 0u64;
    let mut records = 0u64;
    let mut invalid = 0u64;
    loop {
        let field = parse_field::<Span, _>(&mut src, &options);
        if field.consumed == 0 && field.code.eof() {
            break;
        }
        fields += 1;
        if field.code.invalid() {
            invalid += 1;
        }
        if field.code.newline() || field.code.eof() {
            records += 1;
        }
        if field.code.eof() {
            break;
        }
    }
    src.check_io_error()?;

    println!("{records} records, {fields} fields, {invalid} invalid");
    Ok(())
}
