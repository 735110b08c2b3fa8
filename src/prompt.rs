//! Interactive startup questions for values not supplied on the command line.

use std::io::{self, BufRead, Write};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PASSWORD: &str = "0000";

/// Offer `default` and ask whether to change it. A changed value must be
/// non-empty and accepted by `parse`; the question repeats until it is.
pub fn choose<T, R, W>(
    input: &mut R,
    output: &mut W,
    label: &str,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> io::Result<T>
where
    T: std::fmt::Display,
    R: BufRead,
    W: Write,
{
    writeln!(output, "Default {label}: {default}")?;
    write!(output, "Change {label}? (y/N): ")?;
    output.flush()?;

    let answer = read_trimmed(input)?;
    let Some(answer) = answer else {
        return Ok(default);
    };
    if !(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")) {
        return Ok(default);
    }

    loop {
        write!(output, "New {label}: ")?;
        output.flush()?;
        match read_trimmed(input)? {
            None => return Ok(default),
            Some(value) if value.is_empty() => writeln!(output, "{label} cannot be empty.")?,
            Some(value) => match parse(&value) {
                Some(v) => return Ok(v),
                None => writeln!(output, "Invalid {label}: {value}")?,
            },
        }
    }
}

/// One trimmed line, or `None` at end of input.
fn read_trimmed<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

pub fn parse_port(s: &str) -> Option<u16> {
    s.parse().ok().filter(|p| *p != 0)
}

pub fn parse_password(s: &str) -> Option<String> {
    Some(s.to_string())
}
