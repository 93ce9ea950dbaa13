//! Command line framing

const NEWLINE: u8 = b'\n';

/// Frames a command for the subprocess's stdin.
///
/// The returned bytes always end with a newline, and before that there
/// might also be a terminator byte (e.g. `;` for SQL-ish shells). A line
/// that is empty after newline-stripping frames to a bare newline; the
/// terminator is never appended to an empty command.
pub fn frame_command(line: &str, terminator: Option<u8>) -> Vec<u8> {
    let mut bytes = line.as_bytes().to_vec();
    if bytes.last() == Some(&NEWLINE) {
        bytes.pop();
    }
    if bytes.is_empty() {
        return vec![NEWLINE];
    }
    if let Some(t) = terminator {
        if bytes.last() != Some(&t) {
            bytes.push(t);
        }
    }
    bytes.push(NEWLINE);
    bytes
}

#[cfg(test)]
mod tests {
    use super::frame_command;

    const SEMI: Option<u8> = Some(b';');

    #[test]
    fn terminated_framing() {
        assert_eq!(frame_command("", SEMI), b"\n");
        assert_eq!(frame_command("hello", SEMI), b"hello;\n");
        assert_eq!(frame_command("hello;", SEMI), b"hello;\n");
        assert_eq!(frame_command("hello\n", SEMI), b"hello;\n");
        assert_eq!(frame_command("hello;\n", SEMI), b"hello;\n");
    }

    #[test]
    fn unterminated_framing() {
        assert_eq!(frame_command("", None), b"\n");
        assert_eq!(frame_command("hello", None), b"hello\n");
        assert_eq!(frame_command("hello;", None), b"hello;\n");
        assert_eq!(frame_command("hello\n", None), b"hello\n");
        assert_eq!(frame_command("hello;\n", None), b"hello;\n");
    }

    // Framing an already-framed command changes nothing.
    #[test]
    fn framing_is_idempotent() {
        for line in ["hello", "hello;", "select 1"] {
            let once = frame_command(line, SEMI);
            let twice = frame_command(std::str::from_utf8(&once).unwrap(), SEMI);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn bare_newline_stays_bare() {
        assert_eq!(frame_command("\n", SEMI), b"\n");
    }
}
