use std::io::{self, BufRead, Write};

/// Print `message`, then block until the operator submits a line.
///
/// End of input counts as confirmation so piped or detached runs do not hang.
pub fn confirm(input: &mut dyn BufRead, output: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(output, "{message}")?;
    write!(output, "> ")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumes_exactly_one_line() {
        let mut input = io::Cursor::new("\nleftover\n");
        let mut output = Vec::new();

        confirm(&mut input, &mut output, "Press enter").unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "Press enter\n> ");
        let mut rest = String::new();
        input.read_line(&mut rest).unwrap();
        assert_eq!(rest, "leftover\n");
    }

    #[test]
    fn empty_input_is_accepted() {
        let mut input = io::Cursor::new("");
        assert!(confirm(&mut input, &mut io::sink(), "Press enter").is_ok());
    }
}
